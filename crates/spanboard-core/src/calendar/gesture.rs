//! Pointer-driven rescheduling.
//!
//! The controller is the only long-lived state in the calendar: it holds one
//! gesture from pointer-down to pointer-up and returns to `Idle` on every exit
//! path. Commits go to a [`CalendarHost`]; item data is never touched here.

use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::calendar::geometry::{DayCellMap, Point};
pub use crate::calendar::host::GestureKind;
use crate::calendar::host::{CalendarHost, DateCommit};
use crate::datetime::checked_add_days;
use crate::item::{DateRange, ItemId};

/// Pointer listeners acquired for one gesture. The release callback runs
/// exactly once, when the guard is dropped.
pub struct ListenerGuard {
    release: Option<Box<dyn FnOnce()>>,
}

impl ListenerGuard {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// For hosts that route pointer events without subscriptions.
    pub fn detached() -> Self {
        Self { release: None }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("armed", &self.release.is_some())
            .finish()
    }
}

/// What a pointer-down landed on: an item body or one of its edge handles,
/// along with the item's true (unclipped) bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTarget {
    pub item_id: ItemId,
    pub kind: GestureKind,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl GestureTarget {
    pub fn new(item_id: ItemId, kind: GestureKind, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            item_id,
            kind,
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }

    /// The range this gesture would commit if released over `hovered`.
    pub fn candidate(&self, hovered: NaiveDate) -> Option<DateRange> {
        match self.kind {
            GestureKind::Drag => drag_range(self.range(), hovered),
            GestureKind::ResizeStart => Some(resize_start(self.range(), hovered)),
            GestureKind::ResizeEnd => Some(resize_end(self.range(), hovered)),
        }
    }
}

/// Moves `original` so it starts on `hovered`, keeping its duration.
pub fn drag_range(original: DateRange, hovered: NaiveDate) -> Option<DateRange> {
    let delta = (hovered - original.start).num_days();
    let end = checked_add_days(original.end, delta)?;
    Some(DateRange::new(hovered, end))
}

/// New start at `hovered`, clamped so it never passes the end.
pub fn resize_start(original: DateRange, hovered: NaiveDate) -> DateRange {
    DateRange::new(hovered.min(original.end), original.end)
}

/// New end at `hovered`, clamped so it never precedes the start.
pub fn resize_end(original: DateRange, hovered: NaiveDate) -> DateRange {
    DateRange::new(original.start, hovered.max(original.start))
}

#[derive(Debug)]
pub struct ActiveGesture {
    target: GestureTarget,
    hovered: Option<NaiveDate>,
    _listeners: ListenerGuard,
}

impl ActiveGesture {
    pub fn target(&self) -> &GestureTarget {
        &self.target
    }

    pub fn hovered(&self) -> Option<NaiveDate> {
        self.hovered
    }

    /// Candidate range, or the original span while nothing valid is hovered.
    pub fn preview(&self) -> DateRange {
        self.hovered
            .and_then(|day| self.target.candidate(day))
            .unwrap_or_else(|| self.target.range())
    }
}

#[derive(Debug, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging(ActiveGesture),
    ResizingStart(ActiveGesture),
    ResizingEnd(ActiveGesture),
}

impl GestureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, GestureState::Idle)
    }

    pub fn active(&self) -> Option<&ActiveGesture> {
        match self {
            GestureState::Idle => None,
            GestureState::Dragging(active)
            | GestureState::ResizingStart(active)
            | GestureState::ResizingEnd(active) => Some(active),
        }
    }

    fn active_mut(&mut self) -> Option<&mut ActiveGesture> {
        match self {
            GestureState::Idle => None,
            GestureState::Dragging(active)
            | GestureState::ResizingStart(active)
            | GestureState::ResizingEnd(active) => Some(active),
        }
    }

    fn into_active(self) -> Option<ActiveGesture> {
        match self {
            GestureState::Idle => None,
            GestureState::Dragging(active)
            | GestureState::ResizingStart(active)
            | GestureState::ResizingEnd(active) => Some(active),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            GestureState::Idle => "idle",
            GestureState::Dragging(_) => "dragging",
            GestureState::ResizingStart(_) => "resizing_start",
            GestureState::ResizingEnd(_) => "resizing_end",
        }
    }
}

#[derive(Debug, Default)]
pub struct GestureController {
    state: GestureState,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Live range for the renderer; `None` while idle.
    pub fn preview(&self) -> Option<DateRange> {
        self.state.active().map(ActiveGesture::preview)
    }

    /// Pointer-down on a body or handle. Refused while another gesture is
    /// live; the refused guard is released immediately.
    #[tracing::instrument(skip(self, listeners), fields(item = %target.item_id, kind = ?target.kind))]
    pub fn on_gesture_start(&mut self, target: GestureTarget, listeners: ListenerGuard) -> bool {
        if !self.state.is_idle() {
            debug!(state = self.state.name(), "gesture already active; ignoring pointer-down");
            return false;
        }

        let active = ActiveGesture {
            target,
            hovered: None,
            _listeners: listeners,
        };
        self.state = match target.kind {
            GestureKind::Drag => GestureState::Dragging(active),
            GestureKind::ResizeStart => GestureState::ResizingStart(active),
            GestureKind::ResizeEnd => GestureState::ResizingEnd(active),
        };
        debug!(state = self.state.name(), start = %target.start, end = %target.end, "gesture started");
        true
    }

    /// Pointer-move. A position outside every day cell clears the candidate
    /// but keeps the gesture alive.
    pub fn on_gesture_move(&mut self, pointer: Point, cells: &DayCellMap) -> Option<DateRange> {
        let active = self.state.active_mut()?;
        active.hovered = cells.hit_test(pointer);
        if active.hovered.is_none() {
            debug!(x = pointer.x, y = pointer.y, "pointer outside grid; no candidate");
        }
        Some(active.preview())
    }

    /// Pointer-up. Returns to `Idle` first, then emits at most one commit.
    /// Releasing outside the grid, or over a day that leaves the range
    /// unchanged, commits nothing.
    #[tracing::instrument(skip_all)]
    pub fn on_gesture_end<H>(&mut self, pointer: Point, cells: &DayCellMap, host: &mut H) -> Option<DateCommit>
    where
        H: CalendarHost + ?Sized,
    {
        let active = std::mem::take(&mut self.state).into_active()?;
        let target = active.target;
        drop(active);

        let Some(day) = cells.hit_test(pointer) else {
            debug!(item = %target.item_id, "released outside grid; gesture aborted");
            return None;
        };
        let range = target.candidate(day)?;
        if range == target.range() {
            debug!(item = %target.item_id, "range unchanged; nothing to commit");
            return None;
        }

        let commit = DateCommit {
            item_id: target.item_id,
            new_start: range.start,
            new_end: range.end,
            kind: target.kind,
        };
        info!(
            item = %commit.item_id,
            kind = ?commit.kind,
            from = %target.range(),
            to = %range,
            "committing date change"
        );
        host.on_commit_date_change(&commit);
        Some(commit)
    }

    /// Abnormal termination (lost pointer capture, escape). Returns whether a
    /// gesture was actually live.
    pub fn cancel(&mut self) -> bool {
        let previous = std::mem::take(&mut self.state);
        let was_active = !previous.is_idle();
        if was_active {
            debug!(state = previous.name(), "gesture cancelled");
        }
        was_active
    }

    /// Non-drag activation such as a double-click. Ignored mid-gesture.
    pub fn activate<H>(&self, item_id: ItemId, host: &mut H) -> bool
    where
        H: CalendarHost + ?Sized,
    {
        if !self.state.is_idle() {
            debug!(item = %item_id, "activation ignored during gesture");
            return false;
        }
        host.on_open_item(item_id);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use chrono::NaiveDate;

    use super::{GestureController, GestureKind, GestureTarget, ListenerGuard, drag_range, resize_end, resize_start};
    use crate::calendar::geometry::{DayCellMap, Point};
    use crate::calendar::grid::build_grid;
    use crate::calendar::height::LayoutMetrics;
    use crate::calendar::host::CommitLog;
    use crate::item::{DateRange, ItemId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn cells() -> DayCellMap {
        // Feb 2026: Feb 1 (Sunday) .. Mar 14.
        let grid = build_grid(date(2026, 2, 1), 6, date(2026, 2, 1));
        DayCellMap::from_layout(&grid, &BTreeMap::new(), &LayoutMetrics::default(), Point::default())
    }

    fn center(cells: &DayCellMap, day: NaiveDate) -> Point {
        cells.center_of(day).expect("visible day")
    }

    fn counted_guard(counter: &Rc<Cell<u32>>) -> ListenerGuard {
        let counter = Rc::clone(counter);
        ListenerGuard::new(move || counter.set(counter.get() + 1))
    }

    const OUTSIDE: Point = Point::new(-50.0, -50.0);

    #[test]
    fn drag_keeps_duration() {
        let original = DateRange::new(date(2026, 2, 2), date(2026, 2, 6));
        let moved = drag_range(original, date(2026, 2, 17)).expect("in range");
        assert_eq!(moved, DateRange::new(date(2026, 2, 17), date(2026, 2, 21)));
        assert_eq!(moved.duration_days(), original.duration_days());

        let back = drag_range(original, date(2026, 1, 30)).expect("in range");
        assert_eq!(back, DateRange::new(date(2026, 1, 30), date(2026, 2, 3)));
    }

    #[test]
    fn resize_clamps_instead_of_inverting() {
        let original = DateRange::new(date(2026, 2, 2), date(2026, 2, 6));
        assert_eq!(
            resize_start(original, date(2026, 2, 10)),
            DateRange::single(date(2026, 2, 6))
        );
        assert_eq!(
            resize_end(original, date(2026, 1, 20)),
            DateRange::single(date(2026, 2, 2))
        );
        assert_eq!(
            resize_end(original, date(2026, 2, 12)),
            DateRange::new(date(2026, 2, 2), date(2026, 2, 12))
        );
    }

    #[test]
    fn dropping_one_day_item_three_days_later_commits_thursday() {
        let cells = cells();
        let mut controller = GestureController::new();
        let mut host = CommitLog::new();
        let monday = date(2026, 2, 2);
        let thursday = date(2026, 2, 5);

        let target = GestureTarget::new(ItemId::from_u128(1), GestureKind::Drag, monday, monday);
        assert!(controller.on_gesture_start(target, ListenerGuard::detached()));
        let preview = controller.on_gesture_move(center(&cells, thursday), &cells);
        assert_eq!(preview, Some(DateRange::single(thursday)));

        let commit = controller
            .on_gesture_end(center(&cells, thursday), &cells, &mut host)
            .expect("commit");
        assert_eq!(commit.new_start, thursday);
        assert_eq!(commit.new_end, thursday);
        assert_eq!(host.commits, vec![commit]);
        assert!(controller.is_idle());
    }

    #[test]
    fn resize_start_past_end_commits_equal_dates() {
        let cells = cells();
        let mut controller = GestureController::new();
        let mut host = CommitLog::new();
        let target = GestureTarget::new(
            ItemId::from_u128(2),
            GestureKind::ResizeStart,
            date(2026, 2, 3),
            date(2026, 2, 5),
        );

        assert!(controller.on_gesture_start(target, ListenerGuard::detached()));
        controller.on_gesture_move(center(&cells, date(2026, 2, 12)), &cells);
        assert_eq!(controller.preview(), Some(DateRange::single(date(2026, 2, 5))));

        let commit = controller
            .on_gesture_end(center(&cells, date(2026, 2, 12)), &cells, &mut host)
            .expect("commit");
        assert_eq!(commit.new_start, date(2026, 2, 5));
        assert_eq!(commit.new_end, date(2026, 2, 5));
        assert_eq!(commit.kind, GestureKind::ResizeStart);
    }

    #[test]
    fn release_outside_grid_aborts_without_commit() {
        let cells = cells();
        let mut controller = GestureController::new();
        let mut host = CommitLog::new();
        let released = Rc::new(Cell::new(0));
        let target = GestureTarget::new(
            ItemId::from_u128(3),
            GestureKind::ResizeEnd,
            date(2026, 2, 3),
            date(2026, 2, 5),
        );

        assert!(controller.on_gesture_start(target, counted_guard(&released)));
        controller.on_gesture_move(center(&cells, date(2026, 2, 9)), &cells);
        let preview = controller.on_gesture_move(OUTSIDE, &cells);
        assert_eq!(preview, Some(target.range()));

        assert_eq!(controller.on_gesture_end(OUTSIDE, &cells, &mut host), None);
        assert!(host.commits.is_empty());
        assert!(controller.is_idle());
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn pointer_leaving_and_returning_commits_the_returned_day() {
        let cells = cells();
        let mut controller = GestureController::new();
        let mut host = CommitLog::new();
        let released = Rc::new(Cell::new(0));
        let monday = date(2026, 2, 2);
        let target = GestureTarget::new(ItemId::from_u128(4), GestureKind::Drag, monday, date(2026, 2, 3));

        assert!(controller.on_gesture_start(target, counted_guard(&released)));
        assert_eq!(controller.on_gesture_move(OUTSIDE, &cells), Some(target.range()));
        assert_eq!(controller.preview(), Some(target.range()));
        assert!(!controller.is_idle());

        let wednesday = date(2026, 2, 11);
        let preview = controller.on_gesture_move(center(&cells, wednesday), &cells);
        assert_eq!(preview, Some(DateRange::new(wednesday, date(2026, 2, 12))));

        let commit = controller
            .on_gesture_end(center(&cells, wednesday), &cells, &mut host)
            .expect("commit");
        assert_eq!(commit.range(), DateRange::new(wednesday, date(2026, 2, 12)));
        assert_eq!(host.commits, vec![commit]);
        assert_eq!(released.get(), 1);
        assert!(controller.is_idle());
    }

    #[test]
    fn second_pointer_down_is_refused_until_idle() {
        let cells = cells();
        let mut controller = GestureController::new();
        let mut host = CommitLog::new();
        let first_guard = Rc::new(Cell::new(0));
        let second_guard = Rc::new(Cell::new(0));
        let day = date(2026, 2, 10);
        let first = GestureTarget::new(ItemId::from_u128(1), GestureKind::Drag, day, day);
        let second = GestureTarget::new(ItemId::from_u128(2), GestureKind::Drag, day, day);

        assert!(controller.on_gesture_start(first, counted_guard(&first_guard)));
        assert!(!controller.on_gesture_start(second, counted_guard(&second_guard)));
        assert_eq!(second_guard.get(), 1);
        assert_eq!(first_guard.get(), 0);
        assert!(!controller.activate(ItemId::from_u128(2), &mut host));

        let commit = controller
            .on_gesture_end(center(&cells, date(2026, 2, 11)), &cells, &mut host)
            .expect("commit");
        assert_eq!(commit.item_id, ItemId::from_u128(1));
        assert_eq!(first_guard.get(), 1);
        assert_eq!(host.commits.len(), 1);

        assert_eq!(controller.on_gesture_end(center(&cells, day), &cells, &mut host), None);
        assert_eq!(host.commits.len(), 1);
    }

    #[test]
    fn cancel_and_drop_release_listeners() {
        let released = Rc::new(Cell::new(0));
        let day = date(2026, 2, 10);
        let target = GestureTarget::new(ItemId::from_u128(1), GestureKind::Drag, day, day);

        let mut controller = GestureController::new();
        assert!(!controller.cancel());
        assert!(controller.on_gesture_start(target, counted_guard(&released)));
        assert!(controller.cancel());
        assert!(controller.is_idle());
        assert_eq!(released.get(), 1);

        assert!(controller.on_gesture_start(target, counted_guard(&released)));
        drop(controller);
        assert_eq!(released.get(), 2);
    }

    #[test]
    fn unchanged_release_and_activation() {
        let cells = cells();
        let mut controller = GestureController::new();
        let mut host = CommitLog::new();
        let day = date(2026, 2, 10);
        let target = GestureTarget::new(ItemId::from_u128(5), GestureKind::Drag, day, date(2026, 2, 12));

        assert!(controller.on_gesture_start(target, ListenerGuard::detached()));
        assert_eq!(controller.on_gesture_end(center(&cells, day), &cells, &mut host), None);
        assert!(host.commits.is_empty());

        assert!(controller.activate(ItemId::from_u128(5), &mut host));
        assert_eq!(host.opened, vec![ItemId::from_u128(5)]);
    }
}
