use chrono::NaiveDate;
use serde::Serialize;

use crate::item::{DateRange, Item, ItemId};

/// How a committed range was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureKind {
    Drag,
    ResizeStart,
    ResizeEnd,
}

/// A requested date change, emitted once per completed gesture. Nothing
/// is persisted by the layout engine; the host owns that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateCommit {
    pub item_id: ItemId,
    pub new_start: NaiveDate,
    pub new_end: NaiveDate,
    pub kind: GestureKind,
}

impl DateCommit {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.new_start, self.new_end)
    }
}

/// Supplies the cards to lay out for the visible days.
pub trait ItemSource {
    fn list_items_for_visible_range(&self, range: DateRange) -> anyhow::Result<Vec<Item>>;
}

/// Receives gesture outcomes. Implementors persist commits and trigger the
/// next render pass.
pub trait CalendarHost {
    fn on_commit_date_change(&mut self, commit: &DateCommit);

    fn on_open_item(&mut self, item_id: ItemId);
}

/// Records everything it is told; the CLI drains it after a gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitLog {
    pub commits: Vec<DateCommit>,
    pub opened: Vec<ItemId>,
}

impl CommitLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CalendarHost for CommitLog {
    fn on_commit_date_change(&mut self, commit: &DateCommit) {
        self.commits.push(*commit);
    }

    fn on_open_item(&mut self, item_id: ItemId) {
        self.opened.push(item_id);
    }
}

impl ItemSource for [Item] {
    fn list_items_for_visible_range(&self, range: DateRange) -> anyhow::Result<Vec<Item>> {
        Ok(self
            .iter()
            .filter(|item| item_touches(item, range))
            .cloned()
            .collect())
    }
}

/// Whether a card's dates, in either order, reach into `range`.
pub fn item_touches(item: &Item, range: DateRange) -> bool {
    let (start, end) = match (item.start_date, item.end_date) {
        (Some(start), Some(end)) => (start.min(end), start.max(end)),
        (Some(day), None) | (None, Some(day)) => (day, day),
        (None, None) => return false,
    };
    DateRange::new(start, end).overlaps(&range)
}
