use chrono::{Duration, NaiveDate};
use spanboard_core::calendar::{
    CalendarGrid, CommitLog, DayCellMap, GestureController, GestureKind, LayoutMetrics, ListenerGuard, Point,
    build_grid, compute_segments, row_height,
};
use spanboard_core::cli::{Anchor, Command, Edge, ViewArgs};
use spanboard_core::commands::execute;
use spanboard_core::config::CalendarConfig;
use spanboard_core::item::{Item, ItemId};
use spanboard_core::render::Renderer;
use spanboard_core::store::ItemStore;
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn card(id: u128, start: NaiveDate, end: NaiveDate) -> Item {
    Item::new(ItemId::from_u128(id), format!("card {id}")).with_dates(Some(start), Some(end))
}

// February 2026 starts on a Sunday, so row 0 is Feb 1..=7.
fn february(weeks: u32) -> CalendarGrid {
    build_grid(date(2026, 2, 1), weeks, date(2026, 2, 10))
}

fn february_view() -> ViewArgs {
    ViewArgs {
        anchor: Some(Anchor::Date(date(2026, 2, 1))),
        weeks: Some(4),
        ..ViewArgs::default()
    }
}

/// A spread of overlapping cards, some reaching off either end of the grid.
fn busy_board() -> Vec<Item> {
    (0..40_u128)
        .map(|n| {
            let offset = ((n * 7919) % 45) as i64 - 6;
            let length = ((n * 104_729) % 9) as i64;
            let start = date(2026, 2, 1) + Duration::days(offset);
            card(n + 1, start, start + Duration::days(length))
        })
        .collect()
}

#[test]
fn overlapping_cards_in_one_week_stack_into_two_lanes() {
    let grid = february(4);
    let items = vec![
        card(1, date(2026, 2, 2), date(2026, 2, 4)),
        card(2, date(2026, 2, 3), date(2026, 2, 3)),
        card(3, date(2026, 2, 5), date(2026, 2, 6)),
    ];

    let layout = compute_segments(&items, &grid);

    assert_eq!(layout.lane_of(ItemId::from_u128(1)), Some(0));
    assert_eq!(layout.lane_of(ItemId::from_u128(2)), Some(1));
    assert_eq!(layout.lane_of(ItemId::from_u128(3)), Some(0));
    assert_eq!(layout.row_lane_count.get(&0), Some(&2));
    assert_eq!(layout.segments.len(), 3);
}

#[test]
fn weekend_spanning_card_splits_at_the_row_boundary() {
    let grid = february(2);
    let layout = compute_segments(&[card(1, date(2026, 2, 7), date(2026, 2, 10))], &grid);

    assert_eq!(layout.segments.len(), 2);
    let first = layout.segments[0];
    let second = layout.segments[1];

    assert_eq!((first.row, first.start_column, first.end_column), (0, 6, 6));
    assert!(first.is_first_segment);
    assert!(!first.is_last_segment);

    assert_eq!((second.row, second.start_column, second.end_column), (1, 0, 2));
    assert!(!second.is_first_segment);
    assert!(second.is_last_segment);

    assert_eq!(first.lane, second.lane);
}

#[test]
fn dragging_a_one_day_card_three_days_later_commits_that_day() {
    let grid = february(4);
    let items = vec![card(7, date(2026, 2, 2), date(2026, 2, 2))];
    let layout = compute_segments(&items, &grid);
    let metrics = LayoutMetrics::default();
    let cells = DayCellMap::from_layout(&grid, &layout.row_lane_count, &metrics, Point::default());

    let target = layout
        .gesture_target(ItemId::from_u128(7), GestureKind::Drag)
        .expect("drag target");
    let mut controller = GestureController::new();
    let mut host = CommitLog::new();
    assert!(controller.on_gesture_start(target, ListenerGuard::detached()));

    let thursday = cells.center_of(date(2026, 2, 5)).expect("thursday cell");
    controller.on_gesture_move(thursday, &cells);
    let commit = controller
        .on_gesture_end(thursday, &cells, &mut host)
        .expect("commit");

    assert_eq!(commit.new_start, date(2026, 2, 5));
    assert_eq!(commit.new_end, date(2026, 2, 5));
    assert_eq!(host.commits, vec![commit]);
    assert!(controller.is_idle());
}

#[test]
fn layout_ignores_input_order() {
    let grid = february(6);
    let items = busy_board();
    let mut reversed = items.clone();
    reversed.reverse();

    let forward = compute_segments(&items, &grid);
    let backward = compute_segments(&reversed, &grid);

    assert_eq!(forward.segments, backward.segments);
    assert_eq!(forward.lanes, backward.lanes);
    assert_eq!(forward.row_lane_count, backward.row_lane_count);
    assert_eq!(forward, compute_segments(&items, &grid));
}

#[test]
fn duplicate_ids_lay_out_the_same_in_any_order() {
    let grid = february(4);
    let mut items = vec![
        card(1, date(2026, 2, 2), date(2026, 2, 3)),
        card(1, date(2026, 2, 20), date(2026, 2, 21)),
        card(2, date(2026, 2, 3), date(2026, 2, 4)),
    ];
    let forward = compute_segments(&items, &grid);
    items.reverse();
    let backward = compute_segments(&items, &grid);

    assert_eq!(forward.segments, backward.segments);
    assert_eq!(forward.lanes, backward.lanes);
    let kept = forward
        .segments_for(ItemId::from_u128(1))
        .map(|segment| (segment.row, segment.start_column))
        .collect::<Vec<_>>();
    assert_eq!(kept, vec![(0, 1)]);
}

#[test]
fn lanes_never_collide_and_segments_cover_every_visible_day() {
    let grid = february(6);
    let layout = compute_segments(&busy_board(), &grid);
    assert!(!layout.placed.is_empty());

    for placed in &layout.placed {
        let mut covered = layout
            .segments_for(placed.item_id())
            .flat_map(|segment| segment.first_day_index()..=segment.last_day_index())
            .collect::<Vec<_>>();
        covered.sort_unstable();
        let expected = (placed.first_index..=placed.last_index).collect::<Vec<_>>();
        assert_eq!(covered, expected, "coverage for {}", placed.item_id());
    }

    for (i, a) in layout.segments.iter().enumerate() {
        for b in &layout.segments[i + 1..] {
            if a.row != b.row || a.lane != b.lane {
                continue;
            }
            let disjoint = a.end_column < b.start_column || b.end_column < a.start_column;
            assert!(disjoint, "{a:?} overlaps {b:?}");
        }
    }
}

#[test]
fn every_row_is_tall_enough_for_its_lanes() {
    let grid = february(6);
    let layout = compute_segments(&busy_board(), &grid);
    let metrics = LayoutMetrics::default();

    for segment in &layout.segments {
        let count = layout.lane_count(segment.row);
        assert!(segment.lane < count);
        let height = row_height(count, &metrics);
        assert!(metrics.lane_offset(segment.lane) + metrics.bar_height <= height);
    }
    for row in 0..grid.row_count() {
        assert!(row_height(layout.lane_count(row), &metrics) >= metrics.min_row_height);
    }
}

#[test]
fn move_command_persists_the_committed_range() {
    let temp = tempdir().expect("tempdir");
    let store = ItemStore::open(&temp.path().join("items.jsonl")).expect("open store");
    store
        .save_items(&[
            card(1, date(2026, 2, 2), date(2026, 2, 4)),
            card(2, date(2026, 2, 3), date(2026, 2, 3)),
        ])
        .expect("save");

    let cfg = CalendarConfig::default();
    let renderer = Renderer::plain(12);
    let mut out = Vec::new();
    execute(
        &store,
        &cfg,
        &renderer,
        Command::Move {
            item: ItemId::from_u128(1),
            date: date(2026, 2, 16),
            view: february_view(),
        },
        date(2026, 2, 10),
        &mut out,
    )
    .expect("move");

    let moved = store.find(ItemId::from_u128(1)).expect("find");
    assert_eq!(moved.start_date, Some(date(2026, 2, 16)));
    assert_eq!(moved.end_date, Some(date(2026, 2, 18)));
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("2026-02-16..2026-02-18"), "{text}");

    let untouched = store.find(ItemId::from_u128(2)).expect("find");
    assert_eq!(untouched.start_date, Some(date(2026, 2, 3)));
}

#[test]
fn resize_past_the_opposite_edge_collapses_to_one_day() {
    let temp = tempdir().expect("tempdir");
    let store = ItemStore::open(&temp.path().join("items.jsonl")).expect("open store");
    store
        .save_items(&[card(1, date(2026, 2, 9), date(2026, 2, 12))])
        .expect("save");

    let cfg = CalendarConfig::default();
    let mut out = Vec::new();
    execute(
        &store,
        &cfg,
        &Renderer::plain(12),
        Command::Resize {
            item: ItemId::from_u128(1),
            edge: Edge::Start,
            date: date(2026, 2, 20),
            view: february_view(),
        },
        date(2026, 2, 10),
        &mut out,
    )
    .expect("resize");

    let resized = store.find(ItemId::from_u128(1)).expect("find");
    assert_eq!(resized.start_date, Some(date(2026, 2, 12)));
    assert_eq!(resized.end_date, Some(date(2026, 2, 12)));
}

#[test]
fn gestures_that_cannot_start_or_land_are_errors() {
    let temp = tempdir().expect("tempdir");
    let store = ItemStore::open(&temp.path().join("items.jsonl")).expect("open store");
    store
        .save_items(&[card(1, date(2026, 1, 20), date(2026, 2, 3))])
        .expect("save");
    let cfg = CalendarConfig::default();
    let renderer = Renderer::plain(12);

    let clipped_start = execute(
        &store,
        &cfg,
        &renderer,
        Command::Resize {
            item: ItemId::from_u128(1),
            edge: Edge::Start,
            date: date(2026, 2, 2),
            view: february_view(),
        },
        date(2026, 2, 10),
        &mut Vec::new(),
    );
    assert!(clipped_start.is_err());

    let off_grid_drop = execute(
        &store,
        &cfg,
        &renderer,
        Command::Move {
            item: ItemId::from_u128(1),
            date: date(2026, 4, 1),
            view: february_view(),
        },
        date(2026, 2, 10),
        &mut Vec::new(),
    );
    assert!(off_grid_drop.is_err());

    let unknown = execute(
        &store,
        &cfg,
        &renderer,
        Command::Open {
            item: ItemId::from_u128(42),
            view: february_view(),
        },
        date(2026, 2, 10),
        &mut Vec::new(),
    );
    assert!(unknown.is_err());

    let stored = store.find(ItemId::from_u128(1)).expect("find");
    assert_eq!(stored.start_date, Some(date(2026, 1, 20)));
}

#[test]
fn layout_json_reports_segments_and_row_heights() {
    let temp = tempdir().expect("tempdir");
    let store = ItemStore::open(&temp.path().join("items.jsonl")).expect("open store");
    store
        .save_items(&[
            card(1, date(2026, 2, 2), date(2026, 2, 4)),
            card(2, date(2026, 2, 3), date(2026, 2, 3)),
            card(3, date(2026, 7, 1), date(2026, 7, 2)),
        ])
        .expect("save");

    let cfg = CalendarConfig::default();
    let mut out = Vec::new();
    execute(
        &store,
        &cfg,
        &Renderer::plain(12),
        Command::Layout(ViewArgs {
            json: true,
            ..february_view()
        }),
        date(2026, 2, 10),
        &mut out,
    )
    .expect("layout");

    let report: serde_json::Value = serde_json::from_slice(&out).expect("json");
    assert_eq!(report["layout"]["segments"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["row_heights"].as_array().map(Vec::len), Some(4));
    assert_eq!(report["layout"]["row_lane_count"]["0"], 2);
}
