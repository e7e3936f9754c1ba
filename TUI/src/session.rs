//! The explorer session: point store, selection, similarity, chart and
//! submission state behind one set of operations.

use tracing::{debug, info, warn};

use crate::effect::{Completion, Effect, Request, Status};
use crate::error::{FetchError, SubmitRejected};
use crate::point_store::{Point, PointStore};
use crate::render::{ChartHit, ChartSurface, RenderSync};
use crate::selection::{OverflowPolicy, SelectionEngine, Transition};
use crate::similarity::{Outcome, SimilarityCoordinator};
use crate::submission::{EmbeddingPreview, SubmissionFlow, SubmissionState};

pub struct Session<S> {
    store: PointStore,
    selection: SelectionEngine,
    similarity: SimilarityCoordinator,
    render: RenderSync<S>,
    submission: SubmissionFlow,
    preview_components: usize,
    refresh_ticket: u64,
    // A user-requested reload is waiting to report its outcome
    announce_refresh: bool,
    resetting: bool,
}

impl<S: ChartSurface> Session<S> {
    pub fn new(surface: S, policy: OverflowPolicy, preview_components: usize) -> Self {
        Self {
            store: PointStore::new(),
            selection: SelectionEngine::new(policy),
            similarity: SimilarityCoordinator::new(),
            render: RenderSync::new(surface),
            submission: SubmissionFlow::new(),
            preview_components,
            refresh_ticket: 0,
            announce_refresh: false,
            resetting: false,
        }
    }

    pub fn store(&self) -> &PointStore {
        &self.store
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn similarity(&self) -> &SimilarityCoordinator {
        &self.similarity
    }

    pub fn chart(&self) -> &RenderSync<S> {
        &self.render
    }

    pub fn chart_mut(&mut self) -> &mut RenderSync<S> {
        &mut self.render
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.submission.state()
    }

    pub fn can_submit(&self) -> bool {
        !self.submission.is_busy()
    }

    pub fn is_resetting(&self) -> bool {
        self.resetting
    }

    /// Probe the backend and load whatever it already holds.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = self.check_health();
        effects.extend(self.refresh());
        effects
    }

    pub fn check_health(&self) -> Vec<Effect> {
        vec![Effect::Request(Request::Health)]
    }

    /// Fetch a fresh snapshot. Responses to earlier refreshes are ignored
    /// once this one is issued.
    pub fn refresh(&mut self) -> Vec<Effect> {
        self.refresh_ticket += 1;
        vec![Effect::Request(Request::ListPoints {
            ticket: self.refresh_ticket,
        })]
    }

    /// A refresh the user asked for. Unlike background refreshes it reports
    /// how many points came back.
    pub fn reload(&mut self) -> Vec<Effect> {
        self.announce_refresh = true;
        let mut effects = vec![Effect::Status(Status::loading("Reloading points..."))];
        effects.extend(self.refresh());
        effects
    }

    pub fn submit(&mut self, text: &str) -> Vec<Effect> {
        match self.submission.begin(text) {
            Ok(text) => {
                info!(chars = text.chars().count(), "submitting text");
                vec![
                    Effect::Status(Status::loading("Computing embedding...")),
                    Effect::Request(Request::Embed { text }),
                ]
            }
            Err(SubmitRejected::Validation) => {
                vec![Effect::Status(Status::error(SubmitRejected::Validation.to_string()))]
            }
            Err(SubmitRejected::Busy) => {
                debug!("submission already in flight");
                Vec::new()
            }
        }
    }

    pub fn click(&mut self, hit: ChartHit) -> Vec<Effect> {
        let Some(id) = self.render.resolve(hit) else {
            return Vec::new();
        };
        debug!(%id, "toggling point");
        let transition = self.selection.toggle(id);
        self.on_transition(transition)
    }

    pub fn clear_selection(&mut self) -> Vec<Effect> {
        let transition = self.selection.clear();
        self.on_transition(transition)
    }

    /// Delete everything server-side. Callers must have confirmed with the
    /// user first.
    pub fn reset_all(&mut self) -> Vec<Effect> {
        if self.resetting {
            return Vec::new();
        }
        self.resetting = true;
        info!("clearing all embeddings");
        vec![
            Effect::Status(Status::loading("Clearing all embeddings...")),
            Effect::Request(Request::ClearAll),
        ]
    }

    pub fn complete(&mut self, completion: Completion) -> Vec<Effect> {
        match completion {
            Completion::Embedded(result) => self.on_embedded(result),
            Completion::Points { ticket, result } => self.on_points(ticket, result),
            Completion::Similarity { ticket, result } => {
                match self.similarity.complete(ticket, self.selection.ids(), result) {
                    Outcome::Published => Vec::new(),
                    Outcome::Discarded => Vec::new(),
                    Outcome::Failed(err) => {
                        warn!(error = %err, "similarity request failed");
                        vec![Effect::Status(Status::error(format!("Similarity error: {err}")))]
                    }
                }
            }
            Completion::Cleared(result) => self.on_cleared(result),
            Completion::Health(Ok(_)) => {
                vec![Effect::Status(Status::info("Ready! Enter text to begin."))]
            }
            Completion::Health(Err(err)) => {
                vec![Effect::Status(Status::error(format!("Backend unreachable: {err}")))]
            }
        }
    }

    fn on_embedded(&mut self, result: Result<crate::backend::EmbedResponse, FetchError>) -> Vec<Effect> {
        match result {
            Ok(response) => {
                info!(id = %response.id, dims = response.embedding.len(), "embedding computed");
                self.submission.embedded();
                let preview = EmbeddingPreview::from_response(&response, self.preview_components);
                let mut effects = vec![
                    Effect::ShowEmbedding(preview),
                    Effect::Status(Status::success(format!(
                        "Embedding computed successfully! (ID: {}...)",
                        response.id.short()
                    ))),
                    Effect::ClearInput,
                ];
                effects.extend(self.refresh());
                effects
            }
            Err(err) => {
                warn!(error = %err, "embedding failed");
                self.submission.finish();
                vec![Effect::Status(Status::error(format!("Error: {err}")))]
            }
        }
    }

    fn on_points(&mut self, ticket: u64, result: Result<Vec<Point>, FetchError>) -> Vec<Effect> {
        if ticket != self.refresh_ticket {
            debug!(ticket, latest = self.refresh_ticket, "discarding stale refresh");
            return Vec::new();
        }

        let mut effects = Vec::new();
        match result.and_then(|points| self.store.replace(points)) {
            Ok(()) => {
                debug!(points = self.store.len(), "point store refreshed");
                let store = &self.store;
                let transition = self.selection.retain(|id| store.contains(id));
                if transition.changed() {
                    debug!(dropped = transition.previous.len() - transition.current.len(), "dropped stale selection");
                    effects.extend(
                        self.similarity
                            .on_selection(self.selection.ids(), &self.store)
                            .into_iter()
                            .map(Effect::Request),
                    );
                }
                self.render.rebuild(self.store.points(), self.selection.ids());
                if std::mem::take(&mut self.announce_refresh) {
                    let n = self.store.len();
                    effects.push(Effect::Status(Status::success(format!(
                        "Loaded {n} point{}",
                        if n == 1 { "" } else { "s" }
                    ))));
                }
            }
            Err(err) => {
                self.announce_refresh = false;
                warn!(error = %err, "refresh failed");
                effects.push(Effect::Status(Status::error(format!("Visualization error: {err}"))));
            }
        }

        if self.submission.state() == SubmissionState::Refreshing {
            self.submission.finish();
        }
        effects
    }

    fn on_cleared(&mut self, result: Result<(), FetchError>) -> Vec<Effect> {
        self.resetting = false;
        if let Err(err) = result {
            warn!(error = %err, "clearing embeddings failed");
            return vec![Effect::Status(Status::error(format!("Error: {err}")))];
        }

        self.store.clear();
        self.selection.clear();
        let mut effects: Vec<Effect> = self.similarity.reset().into_iter().map(Effect::Request).collect();
        self.render.dispose();
        // Any refresh still in flight predates the clear.
        self.refresh_ticket += 1;
        self.announce_refresh = false;
        if self.submission.state() == SubmissionState::Refreshing {
            self.submission.finish();
        }

        info!("all embeddings cleared");
        effects.push(Effect::ClearPreview);
        effects.push(Effect::Status(Status::success("All embeddings cleared")));
        effects
    }

    fn on_transition(&mut self, transition: Transition) -> Vec<Effect> {
        if !transition.changed() {
            return Vec::new();
        }
        let requests = self.similarity.on_selection(self.selection.ids(), &self.store);
        self.render.rebuild(self.store.points(), self.selection.ids());
        requests.into_iter().map(Effect::Request).collect()
    }
}
