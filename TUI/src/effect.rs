//! Messages between the session and the outside world.
//!
//! Session operations return [`Effect`]s; network results come back as
//! [`Completion`]s. Both are plain data so the session can be driven
//! synchronously in tests.

use crate::backend::{EmbedResponse, HealthResponse, SimilarityResponse};
use crate::error::FetchError;
use crate::point_store::Point;
use crate::similarity::SimilarityRequest;
use crate::submission::EmbeddingPreview;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Loading,
    Success,
    Error,
}

/// Content of the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Info, message)
    }

    pub fn loading(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Loading, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(StatusKind::Error, message)
    }

    fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Network work the runtime should start.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Embed { text: String },
    ListPoints { ticket: u64 },
    Similarity(SimilarityRequest),
    CancelSimilarity { ticket: u64 },
    ClearAll,
    Health,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Request(Request),
    Status(Status),
    ShowEmbedding(EmbeddingPreview),
    ClearPreview,
    ClearInput,
}

/// Result of a request, delivered back to the session in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Embedded(Result<EmbedResponse, FetchError>),
    Points {
        ticket: u64,
        result: Result<Vec<Point>, FetchError>,
    },
    Similarity {
        ticket: u64,
        result: Result<SimilarityResponse, FetchError>,
    },
    Cleared(Result<(), FetchError>),
    Health(Result<HealthResponse, FetchError>),
}
