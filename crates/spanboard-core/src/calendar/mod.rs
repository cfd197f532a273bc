//! Month-grid layout for dated cards.
//!
//! One pass runs grid → intervals → lanes
//! → row segments → row heights. Every
//! stage is pure; re-running it on each
//! data or viewport change is expected.

pub mod geometry;
pub mod gesture;
pub mod grid;
pub mod height;
pub mod host;
pub mod interval;
pub mod lanes;
pub mod segment;

use std::collections::BTreeMap;

use serde::Serialize;

pub use self::geometry::{
  DayCellMap,
  Point,
  Rect
};
pub use self::gesture::{
  GestureController,
  GestureState,
  GestureTarget,
  ListenerGuard
};
pub use self::grid::{
  CalendarGrid,
  Day,
  build_grid,
  build_grid_with_week_start,
  clamp_week_count
};
pub use self::height::{
  LayoutMetrics,
  resolve_row_lane_counts,
  row_height
};
pub use self::host::{
  CalendarHost,
  CommitLog,
  DateCommit,
  GestureKind,
  ItemSource
};
pub use self::interval::{
  Interval,
  PlacedInterval,
  clip_to_grid,
  extract_intervals
};
pub use self::lanes::assign_lanes;
pub use self::segment::{
  Segment,
  segment_interval
};
use crate::item::{
  Item,
  ItemId
};

/// Everything the renderer needs to
/// paint bars for one pass.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct CalendarLayout {
  pub segments:       Vec<Segment>,
  pub row_lane_count: BTreeMap<usize, usize>,
  pub lanes:          BTreeMap<ItemId, usize>,
  pub placed:         Vec<PlacedInterval>
}

impl CalendarLayout {
  pub fn lane_of(
    &self,
    item_id: ItemId
  ) -> Option<usize> {
    self.lanes.get(&item_id).copied()
  }

  pub fn placed_interval(
    &self,
    item_id: ItemId
  ) -> Option<&PlacedInterval> {
    self
      .placed
      .iter()
      .find(|entry| entry.item_id() == item_id)
  }

  pub fn segments_for(
    &self,
    item_id: ItemId
  ) -> impl Iterator<Item = &Segment> {
    self.segments.iter().filter(
      move |segment| {
        segment.item_id == item_id
      }
    )
  }

  pub fn segments_in_row(
    &self,
    row: usize
  ) -> impl Iterator<Item = &Segment> {
    self
      .segments
      .iter()
      .filter(move |segment| segment.row == row)
  }

  pub fn lane_count(
    &self,
    row: usize
  ) -> usize {
    self
      .row_lane_count
      .get(&row)
      .copied()
      .unwrap_or(0)
  }

  /// Pointer-down target for an item on
  /// this layout. Resize handles on an
  /// edge that lies off-grid do not
  /// exist, so those yield `None`.
  pub fn gesture_target(
    &self,
    item_id: ItemId,
    kind: GestureKind
  ) -> Option<GestureTarget> {
    let placed =
      self.placed_interval(item_id)?;
    let allowed = match kind {
      | GestureKind::Drag => true,
      | GestureKind::ResizeStart => {
        !placed.start_clipped
      }
      | GestureKind::ResizeEnd => {
        !placed.end_clipped
      }
    };
    if !allowed {
      tracing::debug!(
        item = %item_id,
        kind = ?kind,
        "edge is off-grid; no handle"
      );
      return None;
    }

    Some(GestureTarget::new(
      item_id,
      kind,
      placed.interval.start_date,
      placed.interval.end_date
    ))
  }
}

/// Lays `items` out on `grid`.
#[tracing::instrument(skip_all, fields(
  items = items.len(),
  days = grid.len()
))]
pub fn compute_segments(
  items: &[Item],
  grid: &CalendarGrid
) -> CalendarLayout {
  let intervals =
    extract_intervals(items);
  let placed = intervals
    .iter()
    .filter_map(|interval| {
      clip_to_grid(interval, grid)
    })
    .collect::<Vec<_>>();
  let dropped =
    intervals.len() - placed.len();
  if dropped > 0 {
    tracing::debug!(
      dropped,
      "intervals outside visible grid"
    );
  }

  let lanes =
    assign_lanes(&placed, grid.len());

  let mut segments = placed
    .iter()
    .zip(lanes.iter())
    .flat_map(|(entry, lane)| {
      segment_interval(entry, *lane)
    })
    .collect::<Vec<_>>();
  segments.sort_by_key(|segment| {
    (
      segment.row,
      segment.lane,
      segment.start_column
    )
  });

  let row_lane_count =
    resolve_row_lane_counts(
      &segments,
      grid.row_count()
    );

  let lanes = placed
    .iter()
    .zip(lanes)
    .map(|(entry, lane)| {
      (entry.item_id(), lane)
    })
    .collect::<BTreeMap<_, _>>();

  tracing::debug!(
    placed = placed.len(),
    segments = segments.len(),
    "computed calendar layout"
  );

  CalendarLayout {
    segments,
    row_lane_count,
    lanes,
    placed
  }
}
