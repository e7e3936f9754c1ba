//! Error types for the explorer.

use thiserror::Error;

/// Failure of a backend call (embed, list, similarity, delete, health).
///
/// The `Display` form is what ends up in the status line, so `Rejected`
/// renders the backend's `detail` verbatim.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The backend answered with a non-success status.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },

    /// The request never produced a response (connection refused, timeout).
    #[error("{0}")]
    Transport(String),

    /// The response arrived but could not be used.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::InvalidResponse(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Reasons a submission never reaches the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitRejected {
    #[error("Please enter some text")]
    Validation,

    #[error("a submission is already in flight")]
    Busy,
}
