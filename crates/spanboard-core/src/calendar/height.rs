use std::collections::BTreeMap;

use serde::{
  Deserialize,
  Serialize
};

use crate::calendar::segment::Segment;

/// Pixel metrics the renderer lays the
/// month grid out with.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Serialize,
  Deserialize,
)]
#[serde(default)]
pub struct LayoutMetrics {
  pub cell_width:        f64,
  pub day_header_height: f64,
  pub bar_height:        f64,
  pub bar_gap:           f64,
  pub min_row_height:    f64
}

impl Default for LayoutMetrics {
  fn default() -> Self {
    Self {
      cell_width:        120.0,
      day_header_height: 24.0,
      bar_height:        20.0,
      bar_gap:           2.0,
      min_row_height:    96.0
    }
  }
}

impl LayoutMetrics {
  /// Vertical offset of `lane` inside its
  /// row, relative to the row top.
  pub fn lane_offset(
    &self,
    lane: usize
  ) -> f64 {
    self.day_header_height
      + lane as f64
        * (self.bar_height + self.bar_gap)
  }
}

/// Lanes needed per row: one more than
/// the highest lane any segment in the
/// row uses. Rows without segments map
/// to zero.
pub fn resolve_row_lane_counts(
  segments: &[Segment],
  row_count: usize
) -> BTreeMap<usize, usize> {
  let mut counts = (0..row_count)
    .map(|row| (row, 0_usize))
    .collect::<BTreeMap<_, _>>();

  for segment in segments {
    let count = counts
      .entry(segment.row)
      .or_insert(0);
    *count =
      (*count).max(segment.lane + 1);
  }

  counts
}

/// Row height tall enough for
/// `lane_count` stacked bars.
pub fn row_height(
  lane_count: usize,
  metrics: &LayoutMetrics
) -> f64 {
  metrics
    .lane_offset(lane_count)
    .max(metrics.min_row_height)
}
