use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::calendar::grid::CalendarGrid;
use crate::calendar::height::{LayoutMetrics, row_height};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment, so a point on a shared border belongs to
    /// exactly one of the two cells.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Screen rectangles of the rendered day cells, used to turn pointer
/// positions into dates while a gesture is live.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayCellMap {
    cells: Vec<(NaiveDate, Rect)>,
}

impl DayCellMap {
    /// Wraps cell rectangles measured by the renderer.
    pub fn from_cells(cells: Vec<(NaiveDate, Rect)>) -> Self {
        Self { cells }
    }

    /// Uniform columns with each row as tall as its lane count needs,
    /// anchored at `origin`.
    pub fn from_layout(
        grid: &CalendarGrid,
        row_lane_count: &BTreeMap<usize, usize>,
        metrics: &LayoutMetrics,
        origin: Point,
    ) -> Self {
        let mut cells = Vec::with_capacity(grid.len());
        let mut top = origin.y;

        for row in 0..grid.row_count() {
            let lanes = row_lane_count.get(&row).copied().unwrap_or(0);
            let height = row_height(lanes, metrics);

            for (column, day) in grid.week_row(row).iter().enumerate() {
                let rect = Rect::new(
                    origin.x + column as f64 * metrics.cell_width,
                    top,
                    metrics.cell_width,
                    height,
                );
                cells.push((day.date, rect));
            }
            top += height;
        }

        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The day whose cell contains `point`, if any.
    pub fn hit_test(&self, point: Point) -> Option<NaiveDate> {
        if !point.x.is_finite() || !point.y.is_finite() {
            return None;
        }
        self.cells
            .iter()
            .find(|(_, rect)| rect.contains(point))
            .map(|(date, _)| *date)
    }

    pub fn cell_of(&self, date: NaiveDate) -> Option<Rect> {
        self.cells
            .iter()
            .find(|(day, _)| *day == date)
            .map(|(_, rect)| *rect)
    }

    pub fn center_of(&self, date: NaiveDate) -> Option<Point> {
        self.cell_of(date).map(|rect| rect.center())
    }

    /// Total grid extent; useful for placing pointers outside it.
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.cells.first()?.1;
        let (mut min_x, mut min_y) = (first.x, first.y);
        let (mut max_x, mut max_y) = (first.x + first.width, first.y + first.height);
        for (_, rect) in &self.cells {
            min_x = min_x.min(rect.x);
            min_y = min_y.min(rect.y);
            max_x = max_x.max(rect.x + rect.width);
            max_y = max_y.max(rect.y + rect.height);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}
