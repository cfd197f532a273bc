use serde::Serialize;

use crate::calendar::grid::DAYS_PER_WEEK;
use crate::calendar::interval::PlacedInterval;
use crate::item::ItemId;

const LAST_COLUMN: usize =
  DAYS_PER_WEEK - 1;

/// One week-row slice of a bar.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct Segment {
  pub item_id:          ItemId,
  pub row:              usize,
  pub start_column:     usize,
  pub end_column:       usize,
  pub lane:             usize,
  pub is_first_segment: bool,
  pub is_last_segment:  bool,
  pub start_clipped:    bool,
  pub end_clipped:      bool
}

impl Segment {
  /// Columns covered, inclusive.
  pub fn column_span(&self) -> usize {
    self.end_column - self.start_column
      + 1
  }

  pub fn first_day_index(&self) -> usize {
    self.row * DAYS_PER_WEEK
      + self.start_column
  }

  pub fn last_day_index(&self) -> usize {
    self.row * DAYS_PER_WEEK
      + self.end_column
  }

  /// The start edge owns a handle only
  /// on the first segment and only when
  /// the real start date is on screen.
  pub fn shows_start_handle(
    &self
  ) -> bool {
    self.is_first_segment
      && !self.start_clipped
  }

  pub fn shows_end_handle(&self) -> bool {
    self.is_last_segment
      && !self.end_clipped
  }
}

/// Splits a placed interval at week-row
/// boundaries. Every segment carries the
/// same lane.
pub fn segment_interval(
  placed: &PlacedInterval,
  lane: usize
) -> Vec<Segment> {
  let first_row =
    placed.first_index / DAYS_PER_WEEK;
  let last_row =
    placed.last_index / DAYS_PER_WEEK;

  (first_row..=last_row)
    .map(|row| {
      let row_start =
        row * DAYS_PER_WEEK;
      let is_first_segment =
        row == first_row;
      let is_last_segment =
        row == last_row;

      let start_column =
        if is_first_segment {
          placed.first_index - row_start
        } else {
          0
        };
      let end_column =
        if is_last_segment {
          (placed.last_index - row_start)
            .min(LAST_COLUMN)
        } else {
          LAST_COLUMN
        };

      Segment {
        item_id: placed.item_id(),
        row,
        start_column,
        end_column,
        lane,
        is_first_segment,
        is_last_segment,
        start_clipped: placed
          .start_clipped,
        end_clipped: placed.end_clipped
      }
    })
    .collect()
}
