use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::Serialize;

use crate::datetime::{
  add_days,
  first_day_of_month,
  start_of_week
};
use crate::item::DateRange;

pub const DAYS_PER_WEEK: usize = 7;
pub const MIN_WEEK_COUNT: u32 = 4;
pub const MAX_WEEK_COUNT: u32 = 8;
pub const DEFAULT_WEEK_COUNT: u32 = 6;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct Day {
  pub date:             NaiveDate,
  pub in_focused_month: bool,
  pub is_today:         bool
}

/// The flat `7 * W` day array of one
/// render pass, row-major by week.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct CalendarGrid {
  anchor:     NaiveDate,
  week_start: Weekday,
  week_count: u32,
  days:       Vec<Day>
}

#[must_use]
pub fn clamp_week_count(
  week_count: u32
) -> u32 {
  week_count
    .clamp(MIN_WEEK_COUNT, MAX_WEEK_COUNT)
}

/// Sunday-start grid for the month
/// containing `anchor`.
#[must_use]
pub fn build_grid(
  anchor: NaiveDate,
  week_count: u32,
  today: NaiveDate
) -> CalendarGrid {
  build_grid_with_week_start(
    anchor,
    week_count,
    Weekday::Sun,
    today
  )
}

#[tracing::instrument(skip_all, fields(
  anchor = %anchor,
  week_count = week_count
))]
pub fn build_grid_with_week_start(
  anchor: NaiveDate,
  week_count: u32,
  week_start: Weekday,
  today: NaiveDate
) -> CalendarGrid {
  let week_count =
    clamp_week_count(week_count);
  let month_first = first_day_of_month(
    anchor.year(),
    anchor.month()
  );
  let grid_start = start_of_week(
    month_first,
    week_start
  );
  let total =
    week_count as usize * DAYS_PER_WEEK;

  let days = (0..total)
    .map(|offset| {
      let date = add_days(
        grid_start,
        offset as i64
      );
      Day {
        date,
        in_focused_month: date.year()
          == anchor.year()
          && date.month()
            == anchor.month(),
        is_today: date == today
      }
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    first = %grid_start,
    days = days.len(),
    "built calendar grid"
  );

  CalendarGrid {
    anchor,
    week_start,
    week_count,
    days
  }
}

impl CalendarGrid {
  pub fn anchor(&self) -> NaiveDate {
    self.anchor
  }

  pub fn week_start(&self) -> Weekday {
    self.week_start
  }

  pub fn week_count(&self) -> u32 {
    self.week_count
  }

  pub fn row_count(&self) -> usize {
    self.week_count as usize
  }

  pub fn days(&self) -> &[Day] {
    &self.days
  }

  pub fn len(&self) -> usize {
    self.days.len()
  }

  pub fn is_empty(&self) -> bool {
    self.days.is_empty()
  }

  pub fn day(
    &self,
    index: usize
  ) -> Option<&Day> {
    self.days.get(index)
  }

  pub fn first_date(&self) -> NaiveDate {
    self
      .days
      .first()
      .map(|day| day.date)
      .unwrap_or(self.anchor)
  }

  pub fn last_date(&self) -> NaiveDate {
    self
      .days
      .last()
      .map(|day| day.date)
      .unwrap_or(self.anchor)
  }

  pub fn visible_range(&self) -> DateRange {
    DateRange::new(
      self.first_date(),
      self.last_date()
    )
  }

  /// Offset of `date` into the flat day
  /// array, if visible.
  pub fn index_of(
    &self,
    date: NaiveDate
  ) -> Option<usize> {
    if self.is_empty()
      || !self
        .visible_range()
        .contains(date)
    {
      return None;
    }
    let offset = (date
      - self.first_date())
    .num_days();
    Some(offset as usize)
  }

  /// `(row, column)` of a flat day
  /// index.
  pub fn position(
    &self,
    index: usize
  ) -> Option<(usize, usize)> {
    (index < self.len()).then_some((
      index / DAYS_PER_WEEK,
      index % DAYS_PER_WEEK
    ))
  }

  pub fn week_row(
    &self,
    row: usize
  ) -> &[Day] {
    let start = row * DAYS_PER_WEEK;
    let end =
      (start + DAYS_PER_WEEK).min(self.len());
    self
      .days
      .get(start..end)
      .unwrap_or(&[])
  }
}
