use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Opaque point identifier assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(String);

impl PointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for status messages.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PointId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<PointId> for String {
    fn from(id: PointId) -> Self {
        id.0
    }
}

/// One plotted embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: PointId,
    pub label: String,
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(id: impl Into<String>, label: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: PointId::new(id),
            label: label.into(),
            x,
            y,
        }
    }
}

/// Local snapshot of every point the backend knows about.
///
/// The snapshot is only ever swapped as a whole.
#[derive(Debug, Default)]
pub struct PointStore {
    points: Vec<Point>,
}

impl PointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot. A listing with duplicate ids is rejected and the
    /// current snapshot is kept.
    pub fn replace(&mut self, points: Vec<Point>) -> Result<(), FetchError> {
        let mut seen = HashSet::with_capacity(points.len());
        for point in &points {
            if !seen.insert(&point.id) {
                return Err(FetchError::InvalidResponse(format!(
                    "duplicate point id {}",
                    point.id
                )));
            }
        }
        self.points = points;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.points = Vec::new();
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn get(&self, id: &PointId) -> Option<&Point> {
        self.points.iter().find(|p| &p.id == id)
    }

    pub fn contains(&self, id: &PointId) -> bool {
        self.get(id).is_some()
    }
}
