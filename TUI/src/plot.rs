//! Terminal scatter plot: the surface charts are mounted on, plus hit testing.

use std::cell::Cell;

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use tracing::warn;
use unicode_width::UnicodeWidthChar;

use crate::render::{ChartEntry, ChartHit, ChartId, ChartSpec, ChartSurface, Rgb, EMPHASIZED_RADIUS};
use crate::ui::{BG_DARK, PALE_YELLOW, TEXT_SECONDARY};

const PATTERN: Color = Color::Rgb(30, 35, 45);

/// Data-space bounds of a chart, padded so points never sit on the border.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Viewport {
    pub fn fit(entries: &[ChartEntry]) -> Self {
        let (min_x, max_x) = padded(entries.iter().map(|e| e.x));
        let (min_y, max_y) = padded(entries.iter().map(|e| e.y));
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Terminal cell for a data point. `y` grows upwards.
    pub fn project(&self, x: f64, y: f64, area: Rect) -> (u16, u16) {
        let cols = f64::from(area.width.saturating_sub(1));
        let rows = f64::from(area.height.saturating_sub(1));
        let tx = ((x - self.min_x) / (self.max_x - self.min_x)).clamp(0.0, 1.0);
        let ty = ((self.max_y - y) / (self.max_y - self.min_y)).clamp(0.0, 1.0);
        (
            area.x + (tx * cols).round() as u16,
            area.y + (ty * rows).round() as u16,
        )
    }
}

fn padded(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Closest entry within one cell of `(column, row)`. Later entries win ties,
/// matching draw order.
pub fn nearest(spec: &ChartSpec, area: Rect, column: u16, row: u16) -> Option<usize> {
    let viewport = Viewport::fit(&spec.entries);
    spec.entries
        .iter()
        .enumerate()
        .filter_map(|(idx, e)| {
            let (px, py) = viewport.project(e.x, e.y, area);
            let dx = px.abs_diff(column);
            let dy = py.abs_diff(row);
            (dx <= 1 && dy <= 1).then_some((dx + dy, idx))
        })
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, idx)| idx)
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

#[derive(Clone)]
enum Slot {
    Empty,
    Glyph(String, Style),
    /// Right half of a wide character.
    Covered,
}

struct Grid {
    area: Rect,
    cells: Vec<Vec<Slot>>,
}

impl Grid {
    fn new(area: Rect) -> Self {
        Self {
            area,
            cells: vec![vec![Slot::Empty; area.width as usize]; area.height as usize],
        }
    }

    fn put(&mut self, column: u16, row: u16, glyph: &str, style: Style) {
        if column < self.area.x || row < self.area.y {
            return;
        }
        let (c, r) = ((column - self.area.x) as usize, (row - self.area.y) as usize);
        if let Some(cell) = self.cells.get_mut(r).and_then(|line| line.get_mut(c)) {
            *cell = Slot::Glyph(glyph.to_string(), style);
        }
    }

    /// Write `text` centred on `column`, clipped to the grid.
    fn text(&mut self, column: u16, row: u16, text: &str, style: Style) {
        let width: usize = text.chars().map(|ch| ch.width().unwrap_or(0)).sum();
        let start = i32::from(column) - (width as i32) / 2;
        let mut x = start;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0) as i32;
            if w == 0 {
                continue;
            }
            let left = i32::from(self.area.x);
            let right = i32::from(self.area.x) + i32::from(self.area.width);
            if x >= left && x + w <= right {
                self.put(x as u16, row, &ch.to_string(), style);
                if w == 2 {
                    let (c, r) = ((x + 1 - left) as usize, (row - self.area.y) as usize);
                    if let Some(cell) = self.cells.get_mut(r).and_then(|line| line.get_mut(c)) {
                        *cell = Slot::Covered;
                    }
                }
            }
            x += w;
        }
    }

    fn into_lines(self) -> Vec<Line<'static>> {
        self.cells
            .into_iter()
            .enumerate()
            .map(|(row_idx, row)| {
                let spans: Vec<Span<'static>> = row
                    .into_iter()
                    .enumerate()
                    .filter_map(|(col_idx, cell)| match cell {
                        Slot::Glyph(glyph, style) => Some(Span::styled(glyph, style)),
                        Slot::Covered => None,
                        Slot::Empty if (row_idx + col_idx) % 8 == 0 => {
                            Some(Span::styled("·", Style::default().fg(PATTERN)))
                        }
                        Slot::Empty => Some(Span::raw(" ")),
                    })
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

/// Draw `spec` into `area` as styled lines. Labels sit one row above their
/// point; emphasized points are drawn last so they stay on top.
pub fn rasterize(spec: &ChartSpec, area: Rect, cursor: Option<usize>) -> Vec<Line<'static>> {
    if area.width == 0 || area.height == 0 {
        return Vec::new();
    }
    let mut grid = Grid::new(area);
    let viewport = Viewport::fit(&spec.entries);

    for entry in &spec.entries {
        let (px, py) = viewport.project(entry.x, entry.y, area);
        if py > area.y {
            let style = if entry.style.emphasized {
                Style::default().fg(color(entry.style.fill)).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(TEXT_SECONDARY)
            };
            grid.text(px, py - 1, &entry.label, style);
        }
    }

    let mut order: Vec<usize> = (0..spec.entries.len()).collect();
    order.sort_by_key(|&idx| spec.entries[idx].style.emphasized);
    for idx in order {
        let entry = &spec.entries[idx];
        let (px, py) = viewport.project(entry.x, entry.y, area);
        let glyph = if entry.style.radius >= EMPHASIZED_RADIUS { "◉" } else { "●" };
        let mut style = Style::default().fg(color(entry.style.fill));
        if entry.style.emphasized {
            style = style.bg(color(entry.style.border)).add_modifier(Modifier::BOLD);
        }
        if cursor == Some(idx) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        grid.put(px, py, glyph, style);
    }

    grid.into_lines()
}

/// The ratatui-backed chart surface. Holds the mounted spec between frames
/// and remembers where it was last drawn for hit testing.
#[derive(Debug, Default)]
pub struct TerminalChart {
    mounted: Option<(ChartId, ChartSpec)>,
    plot_area: Cell<Rect>,
    hovered: Option<usize>,
    cursor: Option<usize>,
}

impl ChartSurface for TerminalChart {
    fn mount(&mut self, id: ChartId, spec: ChartSpec) {
        if let Some((live, _)) = &self.mounted {
            warn!(live = live.0, new = id.0, "mounting over a live chart");
        }
        let len = spec.entries.len();
        self.cursor = self.cursor.map(|c| c.min(len.saturating_sub(1)));
        self.hovered = None;
        self.mounted = Some((id, spec));
    }

    fn dispose(&mut self, id: ChartId) {
        if matches!(&self.mounted, Some((live, _)) if *live == id) {
            self.mounted = None;
            self.hovered = None;
        }
    }
}

impl TerminalChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spec(&self) -> Option<&ChartSpec> {
        self.mounted.as_ref().map(|(_, spec)| spec)
    }

    pub fn hovered(&self) -> Option<&ChartEntry> {
        self.spec()?.entries.get(self.hovered?)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn plot_area(&self) -> Rect {
        self.plot_area.get()
    }

    /// Called while drawing so later clicks map onto what is on screen.
    pub fn set_plot_area(&self, area: Rect) {
        self.plot_area.set(area);
    }

    fn contains(&self, column: u16, row: u16) -> bool {
        let area = self.plot_area();
        column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height
    }

    /// A click inside the plot. Outside the plot, or with nothing mounted,
    /// there is no hit at all.
    pub fn hit_at(&self, column: u16, row: u16) -> Option<ChartHit> {
        let (id, spec) = self.mounted.as_ref()?;
        if !self.contains(column, row) {
            return None;
        }
        Some(ChartHit {
            chart: *id,
            index: nearest(spec, self.plot_area.get(), column, row),
        })
    }

    pub fn hover_at(&mut self, column: u16, row: u16) {
        self.hovered = self
            .hit_at(column, row)
            .and_then(|hit| hit.index);
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    /// Step the keyboard cursor through points in dataset order.
    pub fn move_cursor(&mut self, forward: bool) {
        let Some(len) = self.spec().map(|s| s.entries.len()).filter(|&n| n > 0) else {
            self.cursor = None;
            return;
        };
        self.cursor = Some(match (self.cursor, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(c), true) => (c + 1) % len,
            (Some(c), false) => (c + len - 1) % len,
        });
        self.hovered = self.cursor;
    }

    pub fn cursor_hit(&self) -> Option<ChartHit> {
        let (id, spec) = self.mounted.as_ref()?;
        let index = self.cursor.filter(|&c| c < spec.entries.len())?;
        Some(ChartHit {
            chart: *id,
            index: Some(index),
        })
    }

    /// Tooltip colours.
    pub fn tooltip_style() -> Style {
        Style::default().fg(BG_DARK).bg(PALE_YELLOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_store::{Point, PointId};
    use crate::render::describe;

    fn spec(selected: &[&str]) -> ChartSpec {
        let selection: Vec<PointId> = selected.iter().copied().map(PointId::from).collect();
        describe(
            &[
                Point::new("a", "cat", 0.0, 0.0),
                Point::new("b", "dog", 10.0, 0.0),
                Point::new("c", "car", 5.0, 10.0),
            ],
            &selection,
        )
    }

    fn area() -> Rect {
        Rect::new(2, 1, 41, 21)
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_single_point_viewport_is_not_degenerate() {
        let viewport = Viewport::fit(&spec(&[]).entries[..1]);
        assert!(viewport.max_x > viewport.min_x);
        assert!(viewport.max_y > viewport.min_y);
    }

    #[test]
    fn test_projection_keeps_points_inside_area() {
        let s = spec(&[]);
        let viewport = Viewport::fit(&s.entries);
        let area = area();
        for e in &s.entries {
            let (x, y) = viewport.project(e.x, e.y, area);
            assert!(x >= area.x && x < area.x + area.width);
            assert!(y >= area.y && y < area.y + area.height);
        }
        // Higher y is drawn higher up.
        let (_, low) = viewport.project(0.0, 0.0, area);
        let (_, high) = viewport.project(0.0, 10.0, area);
        assert!(high < low);
    }

    #[test]
    fn test_nearest_finds_point_under_cursor() {
        let s = spec(&[]);
        let area = area();
        let viewport = Viewport::fit(&s.entries);
        let (x, y) = viewport.project(10.0, 0.0, area);

        assert_eq!(nearest(&s, area, x, y), Some(1));
        assert_eq!(nearest(&s, area, x - 1, y), Some(1));
        assert_eq!(nearest(&s, area, area.x + area.width / 2, area.y + area.height / 2), None);
    }

    #[test]
    fn test_rasterize_draws_labels_above_points() {
        let s = spec(&["c"]);
        let area = area();
        let lines = rasterize(&s, area, None);
        assert_eq!(lines.len(), area.height as usize);

        let viewport = Viewport::fit(&s.entries);
        let (_, row) = viewport.project(5.0, 10.0, area);
        let label_row = line_text(&lines[(row - area.y - 1) as usize]);
        assert!(label_row.contains("car"));
        let point_row = line_text(&lines[(row - area.y) as usize]);
        assert!(point_row.contains('◉'));

        let (_, row) = viewport.project(0.0, 0.0, area);
        assert!(line_text(&lines[(row - area.y) as usize]).contains('●'));
    }

    #[test]
    fn test_surface_hits_only_inside_plot() {
        let mut chart = TerminalChart::new();
        assert!(chart.hit_at(5, 5).is_none());

        chart.mount(ChartId(3), spec(&[]));
        chart.set_plot_area(area());
        assert!(chart.hit_at(0, 0).is_none());

        let hit = chart.hit_at(area().x + 20, area().y + 10).unwrap();
        assert_eq!(hit.chart, ChartId(3));
        assert_eq!(hit.index, None);

        chart.dispose(ChartId(3));
        assert!(chart.spec().is_none());
        assert!(chart.hit_at(area().x + 20, area().y + 10).is_none());
    }

    #[test]
    fn test_cursor_wraps_in_dataset_order() {
        let mut chart = TerminalChart::new();
        chart.mount(ChartId(1), spec(&[]));

        chart.move_cursor(false);
        assert_eq!(chart.cursor(), Some(2));
        chart.move_cursor(true);
        assert_eq!(chart.cursor(), Some(0));
        assert_eq!(
            chart.cursor_hit(),
            Some(ChartHit {
                chart: ChartId(1),
                index: Some(0)
            })
        );
        assert_eq!(chart.hovered().unwrap().tooltip(), "cat (0.00, 0.00)");
    }
}
