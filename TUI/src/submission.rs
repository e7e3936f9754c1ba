use std::fmt;

use crate::backend::EmbedResponse;
use crate::error::SubmitRejected;
use crate::point_store::PointId;

/// Bounds for how many leading components the preview shows.
pub const PREVIEW_MIN: usize = 10;
pub const PREVIEW_MAX: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    /// Waiting for `/embed`.
    Submitting,
    /// Embed succeeded; waiting for the follow-up refresh.
    Refreshing,
}

/// Gatekeeper for text submissions: one in flight at a time.
#[derive(Debug, Default)]
pub struct SubmissionFlow {
    state: SubmissionState,
}

impl SubmissionFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != SubmissionState::Idle
    }

    /// Validate `text` and move to `Submitting`. Returns the trimmed text to
    /// send.
    pub fn begin(&mut self, text: &str) -> Result<String, SubmitRejected> {
        if self.is_busy() {
            return Err(SubmitRejected::Busy);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitRejected::Validation);
        }
        self.state = SubmissionState::Submitting;
        Ok(text.to_string())
    }

    /// The embed call succeeded and a refresh has been issued.
    pub fn embedded(&mut self) {
        if self.state == SubmissionState::Submitting {
            self.state = SubmissionState::Refreshing;
        }
    }

    /// The embed call failed, or the follow-up refresh finished either way.
    pub fn finish(&mut self) {
        self.state = SubmissionState::Idle;
    }
}

/// Leading components of the most recent embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingPreview {
    pub id: PointId,
    pub text: Option<String>,
    pub head: Vec<f32>,
    pub dimensions: usize,
}

impl EmbeddingPreview {
    pub fn from_response(response: &EmbedResponse, components: usize) -> Self {
        let take = components.clamp(PREVIEW_MIN, PREVIEW_MAX);
        Self {
            id: response.id.clone(),
            text: response.text.clone(),
            head: response.embedding.iter().copied().take(take).collect(),
            dimensions: response.embedding.len(),
        }
    }
}

impl fmt::Display for EmbeddingPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.head.iter().map(|v| format!("{:.4}", v)).collect();
        let ellipsis = if self.dimensions > self.head.len() { ", ..." } else { "" };
        write!(
            f,
            "[{}{}] ({} dimensions)",
            values.join(", "),
            ellipsis,
            self.dimensions
        )
    }
}
