use serde::{Deserialize, Serialize};

use crate::point_store::PointId;

/// Most points that can be selected at once.
pub const MAX_SELECTED: usize = 2;

/// What happens when a third point is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Drop the longest-selected point and keep the new one.
    #[default]
    EvictOldest,
    /// Ignore the new point.
    RejectNew,
}

/// Selection before and after one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub previous: Vec<PointId>,
    pub current: Vec<PointId>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Ordered, bounded set of selected point ids (oldest first).
#[derive(Debug, Default)]
pub struct SelectionEngine {
    ids: Vec<PointId>,
    policy: OverflowPolicy,
}

impl SelectionEngine {
    pub fn new(policy: OverflowPolicy) -> Self {
        Self {
            ids: Vec::with_capacity(MAX_SELECTED),
            policy,
        }
    }

    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn toggle(&mut self, id: PointId) -> Transition {
        let previous = self.ids.clone();

        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
        } else if self.ids.len() < MAX_SELECTED {
            self.ids.push(id);
        } else {
            match self.policy {
                OverflowPolicy::EvictOldest => {
                    self.ids.remove(0);
                    self.ids.push(id);
                }
                OverflowPolicy::RejectNew => {}
            }
        }

        self.transition(previous)
    }

    pub fn clear(&mut self) -> Transition {
        let previous = std::mem::take(&mut self.ids);
        self.transition(previous)
    }

    /// Drop every id for which `keep` is false, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&PointId) -> bool) -> Transition {
        let previous = self.ids.clone();
        self.ids.retain(|id| keep(id));
        self.transition(previous)
    }

    fn transition(&self, previous: Vec<PointId>) -> Transition {
        Transition {
            previous,
            current: self.ids.clone(),
        }
    }
}
