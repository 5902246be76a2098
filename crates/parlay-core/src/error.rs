//! Error taxonomy for the request path
//!
//! Everything above the provider call propagates as a [`ChatError`];
//! everything at or after the response point is contained in the
//! background tasks and never reaches the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Malformed or missing request fields. Surfaced as a client error
    /// before any backend call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The requested provider tag is not registered. Client error, no
    /// background work scheduled.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// The provider backend failed, timed out, or returned no usable
    /// text. Server error; triggers exactly one audit-error job.
    #[error("provider call failed: {0}")]
    ProviderCall(String),
}

impl ChatError {
    /// Whether the caller is at fault (maps to a 4xx status).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownProvider(_))
    }
}
