use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::grid::CalendarGrid;
use crate::item::{
  DateRange,
  DisplayProps,
  Item,
  ItemId
};

/// A card's inclusive day span.
///
/// `start_date <= end_date` always holds.
/// Cards stored with reversed bounds are
/// swapped during extraction and flagged
/// with `normalized`, so callers can tell
/// the placed span differs from storage.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct Interval {
  pub item_id:    ItemId,
  pub start_date: NaiveDate,
  pub end_date:   NaiveDate,
  pub display:    DisplayProps,
  pub normalized: bool
}

impl Interval {
  pub fn range(&self) -> DateRange {
    DateRange::new(
      self.start_date,
      self.end_date
    )
  }
}

/// An interval pinned to grid offsets.
///
/// `first_index..=last_index` is the span
/// clipped to the visible days; the
/// wrapped interval keeps the true
/// bounds.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct PlacedInterval {
  pub interval:      Interval,
  pub first_index:   usize,
  pub last_index:    usize,
  pub start_clipped: bool,
  pub end_clipped:   bool
}

impl PlacedInterval {
  pub fn item_id(&self) -> ItemId {
    self.interval.item_id
  }

  pub fn day_span(&self) -> usize {
    self.last_index - self.first_index
      + 1
  }
}

#[tracing::instrument(skip_all, fields(
  items = items.len()
))]
pub fn extract_intervals(
  items: &[Item]
) -> Vec<Interval> {
  let mut by_id =
    BTreeMap::<ItemId, Interval>::new();

  for item in items {
    let Some(interval) =
      extract_interval(item)
    else {
      continue;
    };

    match by_id.entry(interval.item_id) {
      | Entry::Vacant(slot) => {
        slot.insert(interval);
      }
      | Entry::Occupied(mut slot) => {
        tracing::warn!(
          item = %interval.item_id,
          "duplicate item id; keeping the earliest copy"
        );
        if duplicate_key(&interval)
          < duplicate_key(slot.get())
        {
          slot.insert(interval);
        }
      }
    }
  }

  let out = by_id
    .into_values()
    .collect::<Vec<_>>();
  tracing::debug!(
    intervals = out.len(),
    "extracted intervals"
  );
  out
}

/// Orders copies of one id so the kept
/// copy does not depend on input order.
fn duplicate_key(
  interval: &Interval
) -> (
  NaiveDate,
  NaiveDate,
  &str,
  Option<&str>,
  Option<&str>
) {
  (
    interval.start_date,
    interval.end_date,
    interval.display.title.as_str(),
    interval.display.color.as_deref(),
    interval.display.list.as_deref()
  )
}

pub fn extract_interval(
  item: &Item
) -> Option<Interval> {
  let (start, end) = match (
    item.start_date,
    item.end_date
  ) {
    | (Some(start), Some(end)) => {
      (start, end)
    }
    | (Some(day), None)
    | (None, Some(day)) => (day, day),
    | (None, None) => return None
  };

  let normalized = start > end;
  if normalized {
    tracing::warn!(
      item = %item.id,
      start = %start,
      end = %end,
      "item dates reversed; swapping bounds for placement"
    );
  }

  Some(Interval {
    item_id: item.id,
    start_date: start.min(end),
    end_date: start.max(end),
    display: item.display.clone(),
    normalized
  })
}

/// Pins `interval` onto `grid`. Spans that
/// miss the grid entirely yield `None`.
pub fn clip_to_grid(
  interval: &Interval,
  grid: &CalendarGrid
) -> Option<PlacedInterval> {
  if grid.is_empty() {
    return None;
  }

  let visible = grid.visible_range();
  if !visible.overlaps(&interval.range())
  {
    tracing::trace!(
      item = %interval.item_id,
      "interval outside visible grid"
    );
    return None;
  }

  let start_clipped =
    interval.start_date < visible.start;
  let end_clipped =
    interval.end_date > visible.end;

  let first_index = if start_clipped {
    0
  } else {
    grid.index_of(interval.start_date)?
  };
  let last_index = if end_clipped {
    grid.len() - 1
  } else {
    grid.index_of(interval.end_date)?
  };

  Some(PlacedInterval {
    interval: interval.clone(),
    first_index,
    last_index,
    start_clipped,
    end_clipped
  })
}
