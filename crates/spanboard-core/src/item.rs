use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a board card across render passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Presentation data carried through the layout untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayProps {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub list: Option<String>,
}

/// A card as supplied by the board. Only items with at least one date
/// bound are laid out on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(flatten)]
    pub display: DisplayProps,
}

impl Item {
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            start_date: None,
            end_date: None,
            display: DisplayProps {
                title: title.into(),
                color: None,
                list: None,
            },
        }
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }

    pub fn title(&self) -> &str {
        self.display.title.as_str()
    }
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    /// Number of days past the start; a one-day range has duration 0.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{DateRange, Item, ItemId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn item_json_flattens_display_props() {
        let raw = r##"{"id":"00000000-0000-0000-0000-000000000007","start_date":"2026-02-03","title":"Ship it","color":"#336699"}"##;
        let item: Item = serde_json::from_str(raw).expect("parse item");

        assert_eq!(item.id, ItemId::from_u128(7));
        assert_eq!(item.start_date, Some(date(2026, 2, 3)));
        assert_eq!(item.end_date, None);
        assert_eq!(item.title(), "Ship it");
        assert_eq!(item.display.color.as_deref(), Some("#336699"));
        assert!(item.is_scheduled());
    }

    #[test]
    fn item_without_dates_is_not_scheduled() {
        let item = Item::new(ItemId::from_u128(1), "backlog");
        assert!(!item.is_scheduled());
    }

    #[test]
    fn range_overlap_is_inclusive() {
        let a = DateRange::new(date(2026, 2, 2), date(2026, 2, 4));
        let b = DateRange::single(date(2026, 2, 4));
        let c = DateRange::new(date(2026, 2, 5), date(2026, 2, 6));

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.duration_days(), 2);
        assert!(a.contains(date(2026, 2, 3)));
    }
}
