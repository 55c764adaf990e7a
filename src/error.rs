//! Error taxonomy for the I/O boundaries of the engine.
//!
//! The classifier and the selection policy never produce these. They are
//! raised by the adapters (location, weather, position feed, music service,
//! token storage) and converted into status values by the normalizer.

/// Failures surfaced by the context and catalog adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// One-shot location fix or weather lookup failed.
    #[error("context acquisition failed: {0}")]
    AcquisitionFailure(String),

    /// A single tick of the continuous position feed failed.
    #[error("position stream failure: {0}")]
    StreamFailure(String),

    /// Authorization code could not be exchanged for an access token.
    #[error("token exchange failed: {0}")]
    AuthExchangeFailure(String),

    /// Remote catalog read failed.
    #[error("catalog fetch failed: {0}")]
    CatalogFetchFailure(String),

    /// A context value is out of its domain (e.g. hour 24).
    #[error("invalid drive context: {0}")]
    InvalidContext(String),

    /// Persisted state could not be read or written.
    #[error("token storage error: {0}")]
    Storage(String),
}

impl ContextError {
    /// True for failures the normalizer absorbs as a degraded status.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AcquisitionFailure(_) | Self::StreamFailure(_) | Self::CatalogFetchFailure(_)
        )
    }
}

impl From<rusqlite::Error> for ContextError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
