//! Error types for the Kameleoon OpenFeature provider.

use thiserror::Error;

use crate::client::ClientError;

/// Errors that can occur in the Kameleoon OpenFeature provider.
#[derive(Debug, Error)]
pub enum Error {
    /// Unrecoverable provider failure: the Kameleoon client could not be
    /// created or failed to initialize.
    #[error("provider fatal error: {0}")]
    ProviderFatal(String),

    /// The Kameleoon client rejected an operation.
    #[error("Kameleoon client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Build a fatal error from an underlying failure, falling back to
    /// `fallback` when the failure carries no message.
    pub(crate) fn fatal(cause: &dyn std::fmt::Display, fallback: &str) -> Self {
        let message = cause.to_string();
        if message.is_empty() {
            Error::ProviderFatal(fallback.to_string())
        } else {
            Error::ProviderFatal(message)
        }
    }
}

/// Result type alias for the provider.
pub type Result<T> = std::result::Result<T, Error>;
