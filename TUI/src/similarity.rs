use tracing::debug;

use crate::backend::SimilarityResponse;
use crate::effect::Request;
use crate::error::FetchError;
use crate::point_store::{Point, PointId, PointStore};

/// A similarity fetch for one selected pair, tagged with the ticket that
/// identifies it.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityRequest {
    pub ticket: u64,
    pub a: Point,
    pub b: Point,
}

impl SimilarityRequest {
    fn is_for(&self, a: &PointId, b: &PointId) -> bool {
        &self.a.id == a && &self.b.id == b
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub point_a: Point,
    pub point_b: Point,
    pub score: f64,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Pending(SimilarityRequest),
    Ready(SimilarityResult),
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Published,
    Discarded,
    Failed(FetchError),
}

/// Keeps the similarity panel in step with the selection.
#[derive(Debug, Default)]
pub struct SimilarityCoordinator {
    state: State,
    last_ticket: u64,
}

impl SimilarityCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self) -> Option<&SimilarityResult> {
        match &self.state {
            State::Ready(result) => Some(result),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<&SimilarityRequest> {
        match &self.state {
            State::Pending(request) => Some(request),
            _ => None,
        }
    }

    /// React to a new selection. Issues at most one fetch, and only when the
    /// selection holds a pair that is not already pending or published.
    pub fn on_selection(&mut self, current: &[PointId], store: &PointStore) -> Vec<Request> {
        let [a, b] = current else {
            return self.retract().into_iter().collect();
        };

        let already_tracked = match &self.state {
            State::Pending(request) => request.is_for(a, b),
            State::Ready(result) => &result.point_a.id == a && &result.point_b.id == b,
            State::Idle => false,
        };
        if already_tracked {
            return Vec::new();
        }

        let mut requests: Vec<Request> = self.retract().into_iter().collect();

        let (Some(point_a), Some(point_b)) = (store.get(a), store.get(b)) else {
            debug!(%a, %b, "selected pair not in store, skipping similarity");
            return requests;
        };

        self.last_ticket += 1;
        let request = SimilarityRequest {
            ticket: self.last_ticket,
            a: point_a.clone(),
            b: point_b.clone(),
        };
        debug!(ticket = request.ticket, %a, %b, "requesting similarity");
        self.state = State::Pending(request.clone());
        requests.push(Request::Similarity(request));
        requests
    }

    /// Apply a response. It is published only if it answers the pending
    /// ticket and that ticket's pair is still the current selection.
    pub fn complete(
        &mut self,
        ticket: u64,
        current: &[PointId],
        result: Result<SimilarityResponse, FetchError>,
    ) -> Outcome {
        let request = match &self.state {
            State::Pending(request) if request.ticket == ticket => request,
            _ => {
                debug!(ticket, "discarding superseded similarity response");
                return Outcome::Discarded;
            }
        };

        let still_selected = matches!(current, [a, b] if request.is_for(a, b));
        if !still_selected {
            debug!(ticket, "selection moved on, discarding similarity response");
            self.state = State::Idle;
            return Outcome::Discarded;
        }

        match result {
            Ok(response) => {
                let State::Pending(request) = std::mem::take(&mut self.state) else {
                    return Outcome::Discarded;
                };
                self.state = State::Ready(SimilarityResult {
                    point_a: request.a,
                    point_b: request.b,
                    score: response.cosine_similarity,
                });
                Outcome::Published
            }
            Err(err) => {
                self.state = State::Idle;
                Outcome::Failed(err)
            }
        }
    }

    /// Forget everything, returning a cancel for any in-flight ticket.
    pub fn reset(&mut self) -> Option<Request> {
        self.retract()
    }

    fn retract(&mut self) -> Option<Request> {
        match std::mem::take(&mut self.state) {
            State::Pending(request) => Some(Request::CancelSimilarity {
                ticket: request.ticket,
            }),
            State::Ready(_) | State::Idle => None,
        }
    }
}
