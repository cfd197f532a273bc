use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, Weekday};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use regex::Regex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::calendar::GestureKind;
use crate::datetime::parse_week_start;
use crate::item::ItemId;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "spanboard",
    version,
    about = "Lay board cards out on a month calendar and reschedule them",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Calendar config file (TOML).
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Item store (JSONL, one card per line).
    #[arg(long = "items", global = true)]
    pub items: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the days of the month grid.
    Grid(ViewArgs),

    /// Lay cards out and print the bars.
    Layout(ViewArgs),

    /// Drag a card so it starts on DATE, keeping its length.
    Move {
        item: ItemId,
        date: NaiveDate,
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Drag one edge of a card to DATE.
    Resize {
        item: ItemId,
        edge: Edge,
        date: NaiveDate,
        #[command(flatten)]
        view: ViewArgs,
    },

    /// Activate a card as a double-click would.
    Open {
        item: ItemId,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// Month to show: YYYY-MM, YYYY-MM-DD or `today`.
    #[arg(long = "anchor", value_parser = parse_anchor)]
    pub anchor: Option<Anchor>,

    #[arg(long = "weeks")]
    pub weeks: Option<u32>,

    #[arg(long = "week-start", value_parser = parse_week_start_arg)]
    pub week_start: Option<Weekday>,

    /// Months to step from the anchor, e.g. -1 for the previous month.
    #[arg(long = "shift", allow_hyphen_values = true, default_value_t = 0)]
    pub shift: i32,

    #[arg(long = "json")]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Start,
    End,
}

impl Edge {
    pub fn gesture_kind(self) -> GestureKind {
        match self {
            Edge::Start => GestureKind::ResizeStart,
            Edge::End => GestureKind::ResizeEnd,
        }
    }
}

impl Command {
    pub fn view(&self) -> &ViewArgs {
        match self {
            Command::Grid(view) | Command::Layout(view) => view,
            Command::Move { view, .. } | Command::Resize { view, .. } | Command::Open { view, .. } => view,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Grid(_) => "grid",
            Command::Layout(_) => "layout",
            Command::Move { .. } => "move",
            Command::Resize { .. } => "resize",
            Command::Open { .. } => "open",
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Month the grid is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Today,
    Date(NaiveDate),
}

impl Anchor {
    pub fn resolve(self, today: NaiveDate) -> NaiveDate {
        match self {
            Anchor::Today => today,
            Anchor::Date(date) => date,
        }
    }
}

pub fn parse_anchor(raw: &str) -> anyhow::Result<Anchor> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("today") {
        return Ok(Anchor::Today);
    }

    let anchor_re = Regex::new(r"^(?P<year>\d{4})-(?P<month>\d{1,2})(?:-(?P<day>\d{1,2}))?$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
    let caps = anchor_re
        .captures(trimmed)
        .ok_or_else(|| anyhow!("expected YYYY-MM, YYYY-MM-DD or `today`, got: {raw}"))?;

    let year: i32 = caps["year"].parse().context("invalid year")?;
    let month: u32 = caps["month"].parse().context("invalid month")?;
    let day: u32 = match caps.name("day") {
        Some(day) => day.as_str().parse().context("invalid day")?,
        None => 1,
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Anchor::Date)
        .ok_or_else(|| anyhow!("no such date: {raw}"))
}

fn parse_week_start_arg(raw: &str) -> anyhow::Result<Weekday> {
    parse_week_start(raw).ok_or_else(|| anyhow!("week start must be sunday or monday, got: {raw}"))
}
