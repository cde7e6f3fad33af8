//! Error taxonomy for the measurement refresh path.
//!
//! Transport failures are `Clone` so that a single outcome can be handed to
//! every caller attached to the same in-flight fetch.

use std::time::Duration;

use thiserror::Error;

// ---

/// Failure of one GET against the measurement endpoint.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timeout after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Airly API request failed with status {status}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(String),
}

/// Error surfaced to direct callers of `RefreshEngine::refresh`.
#[derive(Debug, Clone, Error)]
pub enum RefreshError {
    /// The upstream service could not be reached or answered badly.
    #[error("Service communication failure: {0}")]
    ServiceCommunication(#[source] FetchError),

    /// The in-flight fetch ended without publishing an outcome.
    #[error("Refresh task ended before producing a result")]
    Aborted,
}

impl FetchError {
    /// Response body for status failures, truncated for log output.
    pub fn body_excerpt(&self) -> Option<&str> {
        // ---
        match self {
            FetchError::Status { body, .. } => {
                let mut end = body.len().min(500);
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                Some(&body[..end])
            }
            _ => None,
        }
    }
}
