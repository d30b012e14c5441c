//! Error types for the Comptoir auth core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// The credential store timed out or is unreachable. Retryable.
    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(String),

    /// Email handoff failed. Retryable; non-critical call sites
    /// downgrade this to a warning.
    #[error("Email delivery failed: {0}")]
    DeliveryError(String),

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the failed operation may be retried by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::StoreUnavailable(_) | CoreError::DeliveryError(_)
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
