use std::io::{self, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::calendar::{
    CalendarGrid, CalendarLayout, CommitLog, DateCommit, DayCellMap, GestureController, GestureKind, GestureTarget,
    ItemSource, ListenerGuard, Point, build_grid_with_week_start, compute_segments, row_height,
};
use crate::cli::{Anchor, Command, ViewArgs};
use crate::config::CalendarConfig;
use crate::datetime::{resolve_timezone, shift_months, today_in_timezone};
use crate::item::{Item, ItemId};
use crate::render::Renderer;
use crate::store::ItemStore;

#[derive(Debug, Serialize)]
struct LayoutReport<'a> {
    grid: &'a CalendarGrid,
    layout: &'a CalendarLayout,
    row_heights: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct GestureReport<'a> {
    item: ItemId,
    kind: GestureKind,
    committed: bool,
    item_after: &'a Item,
}

#[instrument(skip(store, cfg, renderer, command), fields(command = command.name()))]
pub fn dispatch(store: &ItemStore, cfg: &CalendarConfig, renderer: &Renderer, command: Command) -> anyhow::Result<()> {
    let today = today_in_timezone(resolve_timezone(cfg.timezone.as_deref()));
    debug!(%today, "resolved today");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(store, cfg, renderer, command, today, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Runs one command against `store`, writing its output to `out`.
pub fn execute<W: Write>(
    store: &ItemStore,
    cfg: &CalendarConfig,
    renderer: &Renderer,
    command: Command,
    today: NaiveDate,
    out: &mut W,
) -> anyhow::Result<()> {
    match command {
        Command::Grid(view) => cmd_grid(cfg, renderer, &view, today, out),
        Command::Layout(view) => cmd_layout(store, cfg, renderer, &view, today, out),
        Command::Move { item, date, view } => {
            cmd_gesture(store, cfg, renderer, &view, today, item, GestureKind::Drag, date, out)
        }
        Command::Resize { item, edge, date, view } => {
            cmd_gesture(store, cfg, renderer, &view, today, item, edge.gesture_kind(), date, out)
        }
        Command::Open { item, view } => cmd_open(store, renderer, &view, item, out),
    }
}

/// Builds the grid a view asks for, falling back to config for anything
/// the flags leave unset.
pub fn resolve_grid(cfg: &CalendarConfig, view: &ViewArgs, today: NaiveDate) -> CalendarGrid {
    let anchor = view.anchor.unwrap_or(Anchor::Today).resolve(today);
    let anchor = shift_months(anchor, view.shift);
    let week_count = view.weeks.unwrap_or(cfg.grid.week_count);
    let week_start = view.week_start.unwrap_or_else(|| cfg.week_start());

    build_grid_with_week_start(anchor, week_count, week_start, today)
}

fn load_layout(
    store: &ItemStore,
    cfg: &CalendarConfig,
    view: &ViewArgs,
    today: NaiveDate,
) -> anyhow::Result<(CalendarGrid, CalendarLayout)> {
    let grid = resolve_grid(cfg, view, today);
    let items = store.list_items_for_visible_range(grid.visible_range())?;
    let layout = compute_segments(&items, &grid);
    Ok((grid, layout))
}

fn cmd_grid<W: Write>(
    cfg: &CalendarConfig,
    renderer: &Renderer,
    view: &ViewArgs,
    today: NaiveDate,
    out: &mut W,
) -> anyhow::Result<()> {
    let grid = resolve_grid(cfg, view, today);
    info!(anchor = %grid.anchor(), days = grid.len(), "rendering grid");

    if view.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&grid)?)?;
        return Ok(());
    }
    renderer.write_grid(out, &grid)
}

fn cmd_layout<W: Write>(
    store: &ItemStore,
    cfg: &CalendarConfig,
    renderer: &Renderer,
    view: &ViewArgs,
    today: NaiveDate,
    out: &mut W,
) -> anyhow::Result<()> {
    let (grid, layout) = load_layout(store, cfg, view, today)?;
    info!(
        anchor = %grid.anchor(),
        items = layout.placed.len(),
        segments = layout.segments.len(),
        "rendering layout"
    );

    if view.json {
        let row_heights = (0..grid.row_count())
            .map(|row| row_height(layout.lane_count(row), &cfg.layout))
            .collect();
        let report = LayoutReport {
            grid: &grid,
            layout: &layout,
            row_heights,
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        return Ok(());
    }
    renderer.write_layout(out, &grid, &layout)
}

/// Replays a pointer-down, move and release over the laid-out grid, then
/// persists whatever the controller commits.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(store, cfg, renderer, view, out))]
fn cmd_gesture<W: Write>(
    store: &ItemStore,
    cfg: &CalendarConfig,
    renderer: &Renderer,
    view: &ViewArgs,
    today: NaiveDate,
    item: ItemId,
    kind: GestureKind,
    to: NaiveDate,
    out: &mut W,
) -> anyhow::Result<()> {
    let (grid, layout) = load_layout(store, cfg, view, today)?;

    let target = match layout.gesture_target(item, kind) {
        Some(target) => target,
        None if layout.placed_interval(item).is_none() => {
            return Err(anyhow!("item {item} has no dates on the visible grid"));
        }
        None => {
            return Err(anyhow!("item {item} has no {kind:?} handle: that edge lies outside the visible grid"));
        }
    };

    let cells = DayCellMap::from_layout(&grid, &layout.row_lane_count, &cfg.layout, Point::default());
    let pointer = cells
        .center_of(to)
        .ok_or_else(|| anyhow!("{to} is outside the visible grid {}", grid.visible_range()))?;

    let mut controller = GestureController::new();
    let mut host = CommitLog::new();
    let commit = replay_gesture(&mut controller, target, pointer, &cells, &mut host)?;

    let item_after = match commit {
        Some(commit) => {
            let updated = store.apply_commit(&commit)?;
            if !view.json {
                renderer.write_commit(out, &commit, updated.title())?;
            }
            updated
        }
        None => {
            info!(item = %item, to = %to, "gesture produced no change");
            let unchanged = store.find(item)?;
            if !view.json {
                writeln!(out, "{} unchanged at {}", unchanged.title(), target.range())?;
            }
            unchanged
        }
    };

    if view.json {
        let report = GestureReport {
            item,
            kind,
            committed: commit.is_some(),
            item_after: &item_after,
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    }
    Ok(())
}

/// Pointer-down on `target`, one move to `pointer`, release there.
fn replay_gesture(
    controller: &mut GestureController,
    target: GestureTarget,
    pointer: Point,
    cells: &DayCellMap,
    host: &mut CommitLog,
) -> anyhow::Result<Option<DateCommit>> {
    if !controller.on_gesture_start(target, ListenerGuard::detached()) {
        return Err(anyhow!(
            "could not start a {:?} gesture on item {}: another gesture is active",
            target.kind,
            target.item_id
        ));
    }
    if let Some(preview) = controller.on_gesture_move(pointer, cells) {
        debug!(%preview, "gesture preview");
    }
    Ok(controller.on_gesture_end(pointer, cells, host))
}

fn cmd_open<W: Write>(
    store: &ItemStore,
    renderer: &Renderer,
    view: &ViewArgs,
    item: ItemId,
    out: &mut W,
) -> anyhow::Result<()> {
    let controller = GestureController::new();
    open_with(&controller, store, renderer, view, item, out)
}

/// Activates `item` through `controller` and prints it. Activation is
/// refused while a gesture is live.
fn open_with<W: Write>(
    controller: &GestureController,
    store: &ItemStore,
    renderer: &Renderer,
    view: &ViewArgs,
    item: ItemId,
    out: &mut W,
) -> anyhow::Result<()> {
    let mut host = CommitLog::new();
    if !controller.activate(item, &mut host) {
        return Err(anyhow!("cannot open item {item} while a gesture is active"));
    }

    for opened in &host.opened {
        let found = store.find(*opened)?;
        info!(item = %found.id, "opening item");
        if view.json {
            writeln!(out, "{}", serde_json::to_string_pretty(&found)?)?;
        } else {
            renderer.write_item(out, &found)?;
        }
    }
    Ok(())
}
