//! Authentication error types.

use comptoir_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or wrong password — deliberately indistinguishable
    /// so login failures cannot be used to enumerate accounts.
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid one-time code")]
    InvalidTotpCode,

    #[error("second factor is not enrolled for this principal")]
    TwoFactorNotEnrolled,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token signature: {0}")]
    InvalidSignature(String),

    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("provisioning image rendering failed: {0}")]
    RenderError(String),

    /// A permission check ran before `load` populated the cache.
    /// The engine never fetches implicitly — this is a caller bug.
    #[error("permissions not loaded for this principal")]
    PermissionsNotLoaded,

    /// Expired or invalid refresh token; the session must re-login.
    #[error("session expired")]
    SessionExpired,

    #[error("password shorter than {min} characters")]
    WeakPassword { min: usize },

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("rate limit exceeded")]
    RateLimited,
}

impl From<AuthError> for CoreError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::InvalidTotpCode
            | AuthError::TwoFactorNotEnrolled
            | AuthError::TokenExpired
            | AuthError::InvalidSignature(_)
            | AuthError::SessionExpired => CoreError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::PermissionsNotLoaded => CoreError::AuthorizationDenied {
                reason: err.to_string(),
            },
            AuthError::InvalidPrincipal(_) | AuthError::WeakPassword { .. } => {
                CoreError::Validation {
                    message: err.to_string(),
                }
            }
            AuthError::RenderError(msg) | AuthError::Crypto(msg) => CoreError::Crypto(msg),
            AuthError::RateLimited => CoreError::RateLimited,
        }
    }
}
