use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use chrono::Datelike;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::calendar::{CalendarGrid, CalendarLayout, DateCommit, Day, Segment};
use crate::config::CalendarConfig;
use crate::item::{Item, ItemId};

const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    column_width: usize,
}

impl Renderer {
    pub fn new(cfg: &CalendarConfig) -> Self {
        Self {
            color: cfg.render.color && io::stdout().is_terminal(),
            column_width: cfg.render.column_width,
        }
    }

    pub fn plain(column_width: usize) -> Self {
        Self {
            color: false,
            column_width: column_width.max(6),
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn write_grid<W: Write>(&self, out: &mut W, grid: &CalendarGrid) -> anyhow::Result<()> {
        self.write_weekday_header(out, grid)?;
        for row in 0..grid.row_count() {
            self.write_day_numbers(out, grid.week_row(row))?;
        }
        Ok(())
    }

    /// Text calendar: per week a day-number line, then one line per lane.
    #[tracing::instrument(skip_all)]
    pub fn write_layout<W: Write>(
        &self,
        out: &mut W,
        grid: &CalendarGrid,
        layout: &CalendarLayout,
    ) -> anyhow::Result<()> {
        self.write_weekday_header(out, grid)?;
        let rule = "-".repeat(self.column_width * 7);
        let titles = bar_titles(layout);

        for row in 0..grid.row_count() {
            writeln!(out, "{rule}")?;
            self.write_day_numbers(out, grid.week_row(row))?;

            for lane in 0..layout.lane_count(row) {
                let mut bars = layout
                    .segments_in_row(row)
                    .filter(|segment| segment.lane == lane)
                    .collect::<Vec<_>>();
                bars.sort_by_key(|segment| segment.start_column);
                let line = self.lane_line(&bars, &titles);
                writeln!(out, "{}", line.trim_end())?;
            }
        }
        writeln!(out, "{rule}")?;
        Ok(())
    }

    pub fn write_item<W: Write>(&self, out: &mut W, item: &Item) -> anyhow::Result<()> {
        writeln!(out, "id     {}", item.id)?;
        writeln!(out, "title  {}", item.title())?;
        if let Some(list) = &item.display.list {
            writeln!(out, "list   {list}")?;
        }
        if let Some(color) = &item.display.color {
            writeln!(out, "color  {color}")?;
        }
        if let Some(start) = item.start_date {
            writeln!(out, "start  {}", start.format("%Y-%m-%d"))?;
        }
        if let Some(end) = item.end_date {
            writeln!(out, "end    {}", end.format("%Y-%m-%d"))?;
        }
        Ok(())
    }

    pub fn write_commit<W: Write>(&self, out: &mut W, commit: &DateCommit, title: &str) -> anyhow::Result<()> {
        writeln!(out, "{} {} -> {}", self.paint(title, "1"), commit.item_id, commit.range())?;
        Ok(())
    }

    fn write_weekday_header<W: Write>(&self, out: &mut W, grid: &CalendarGrid) -> anyhow::Result<()> {
        let first = grid.week_start().num_days_from_monday() as usize;
        let mut line = String::new();
        for offset in 0..7 {
            line.push_str(&pad(WEEKDAY_NAMES[(first + offset) % 7], self.column_width));
        }
        writeln!(out, "{}", line.trim_end())?;
        Ok(())
    }

    fn write_day_numbers<W: Write>(&self, out: &mut W, week: &[Day]) -> anyhow::Result<()> {
        let mut line = String::new();
        for day in week {
            let mut label = day.date.day().to_string();
            if day.is_today {
                label.push('*');
            }
            let label = if !day.in_focused_month && !self.color {
                format!("({label})")
            } else {
                label
            };
            let padded = pad(&label, self.column_width);
            let painted = if day.is_today {
                self.paint(&padded, "1;33")
            } else if !day.in_focused_month {
                self.paint(&padded, "2")
            } else {
                padded
            };
            line.push_str(&painted);
        }
        writeln!(out, "{}", line.trim_end())?;
        Ok(())
    }

    fn lane_line(&self, bars: &[&Segment], titles: &BTreeMap<ItemId, &str>) -> String {
        let mut line = String::new();
        let mut column = 0;

        for segment in bars {
            if segment.start_column > column {
                line.push_str(&" ".repeat((segment.start_column - column) * self.column_width));
            }
            let title = titles.get(&segment.item_id).copied().unwrap_or_default();
            let width = segment.column_span() * self.column_width;
            line.push_str(&self.paint(&bar_text(segment, title, width), "36"));
            column = segment.end_column + 1;
        }

        line
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn bar_titles(layout: &CalendarLayout) -> BTreeMap<ItemId, &str> {
    layout
        .placed
        .iter()
        .map(|placed| (placed.item_id(), placed.interval.display.title.as_str()))
        .collect()
}

/// Draws one bar `width` columns wide. The last column is left blank so
/// bars in adjacent days stay apart.
pub fn bar_text(segment: &Segment, title: &str, width: usize) -> String {
    let body = width.saturating_sub(1).max(2);
    let left = if segment.shows_start_handle() {
        '['
    } else if segment.is_first_segment && segment.start_clipped {
        '<'
    } else {
        '='
    };
    let right = if segment.shows_end_handle() {
        ']'
    } else if segment.is_last_segment && segment.end_clipped {
        '>'
    } else {
        '='
    };

    let inner = body - 2;
    let label = truncate_to_width(title, inner);
    let fill = inner - UnicodeWidthStr::width(label.as_str());
    format!("{left}{label}{}{right} ", " ".repeat(fill))
}

fn truncate_to_width(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > max {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

fn pad(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(text);
    format!("{text}{}", " ".repeat(width.saturating_sub(visible)))
}
