//! Chart description and the lifecycle of the one mounted chart.

use tracing::{debug, warn};

use crate::point_store::{Point, PointId};

pub const NORMAL_RADIUS: f64 = 8.0;
pub const EMPHASIZED_RADIUS: f64 = 12.0;

pub const X_AXIS_TITLE: &str = "UMAP Dimension 1";
pub const Y_AXIS_TITLE: &str = "UMAP Dimension 2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

const NORMAL_FILL: Rgb = Rgb(102, 126, 234);
const NORMAL_BORDER: Rgb = Rgb(84, 112, 156);
const EMPHASIZED_FILL: Rgb = Rgb(234, 208, 148);
const EMPHASIZED_BORDER: Rgb = Rgb(204, 92, 68);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointStyle {
    pub emphasized: bool,
    pub radius: f64,
    pub fill: Rgb,
    pub border: Rgb,
}

impl PointStyle {
    pub fn normal() -> Self {
        Self {
            emphasized: false,
            radius: NORMAL_RADIUS,
            fill: NORMAL_FILL,
            border: NORMAL_BORDER,
        }
    }

    pub fn emphasized() -> Self {
        Self {
            emphasized: true,
            radius: EMPHASIZED_RADIUS,
            fill: EMPHASIZED_FILL,
            border: EMPHASIZED_BORDER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartEntry {
    pub id: PointId,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub style: PointStyle,
}

impl ChartEntry {
    /// Hover text: label and coordinates to two decimals.
    pub fn tooltip(&self) -> String {
        format!("{} ({:.2}, {:.2})", self.label, self.x, self.y)
    }
}

/// Everything a surface needs to draw one chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub entries: Vec<ChartEntry>,
    pub x_title: &'static str,
    pub y_title: &'static str,
}

/// Build the chart for `points` with `selection` emphasized. Entry order
/// equals point order.
pub fn describe(points: &[Point], selection: &[PointId]) -> ChartSpec {
    let entries = points
        .iter()
        .map(|p| ChartEntry {
            id: p.id.clone(),
            label: p.label.clone(),
            x: p.x,
            y: p.y,
            style: if selection.contains(&p.id) {
                PointStyle::emphasized()
            } else {
                PointStyle::normal()
            },
        })
        .collect();

    ChartSpec {
        entries,
        x_title: X_AXIS_TITLE,
        y_title: Y_AXIS_TITLE,
    }
}

/// Identity of one mounted chart instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChartId(pub u64);

/// A click reported by a surface: which chart it landed on and which entry
/// (if any) it hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartHit {
    pub chart: ChartId,
    pub index: Option<usize>,
}

/// A drawing capability that can host one chart at a time.
pub trait ChartSurface {
    fn mount(&mut self, id: ChartId, spec: ChartSpec);

    fn dispose(&mut self, id: ChartId);
}

#[derive(Debug)]
struct Mounted {
    id: ChartId,
    ids: Vec<PointId>,
}

/// Owns the surface and the single mounted chart on it.
pub struct RenderSync<S> {
    surface: S,
    mounted: Option<Mounted>,
    last_id: u64,
}

impl<S: ChartSurface> RenderSync<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            mounted: None,
            last_id: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn current(&self) -> Option<ChartId> {
        self.mounted.as_ref().map(|m| m.id)
    }

    /// Dispose the current chart and mount a fresh one. Nothing is mounted
    /// for an empty point set.
    pub fn rebuild(&mut self, points: &[Point], selection: &[PointId]) {
        self.dispose();
        if points.is_empty() {
            debug!("no points, skipping chart");
            return;
        }

        self.last_id += 1;
        let id = ChartId(self.last_id);
        let spec = describe(points, selection);
        let ids = spec.entries.iter().map(|e| e.id.clone()).collect();
        debug!(chart = id.0, points = points.len(), "mounting chart");
        self.surface.mount(id, spec);
        self.mounted = Some(Mounted { id, ids });
    }

    pub fn dispose(&mut self) {
        if let Some(mounted) = self.mounted.take() {
            self.surface.dispose(mounted.id);
        }
    }

    /// Map a hit back to the point it landed on. Misses and hits on a chart
    /// that has since been replaced resolve to nothing.
    pub fn resolve(&self, hit: ChartHit) -> Option<PointId> {
        let mounted = self.mounted.as_ref()?;
        if mounted.id != hit.chart {
            warn!(hit = hit.chart.0, current = mounted.id.0, "ignoring hit on disposed chart");
            return None;
        }
        mounted.ids.get(hit.index?).cloned()
    }
}
