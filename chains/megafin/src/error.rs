use core_logic::{GateError, RetryError};
use thiserror::Error;

/// Errors that stop one account's worker.
///
/// Remote failures (timeouts, interception pages, bad JSON, 401s) never show
/// up here: they are retried or turned into a re-login inside the engine.
#[derive(Error, Debug)]
pub enum FarmError {
    #[error("Invalid private key: {reason}")]
    InvalidPrivateKey { reason: String },

    #[error("Failed to sign login message: {reason}")]
    Signing { reason: String },

    #[error("Failed to encode request body: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error(transparent)]
    RetriesExhausted(#[from] RetryError),

    #[error(transparent)]
    Gate(#[from] GateError),
}

impl FarmError {
    /// Structurally broken input. Retrying cannot fix these.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FarmError::InvalidPrivateKey { .. } | FarmError::Signing { .. } | FarmError::Encoding(_)
        )
    }
}
