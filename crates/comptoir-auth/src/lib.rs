//! Comptoir Auth — token issuance and verification, TOTP second
//! factor, permission engine, and session orchestration.
//!
//! The four components are independently usable: [`token::verify_access`]
//! is the stateless trust boundary for downstream services, while
//! [`session::SessionOrchestrator`] sequences the full login flow
//! (password check, optional 2FA challenge, token issuance, permission
//! preload) over the store traits from `comptoir-core`.

pub mod api;
pub mod config;
pub mod error;
mod fetch;
pub mod guard;
pub mod password;
pub mod permission;
pub mod session;
pub mod token;
pub mod totp;

pub use config::AuthConfig;
pub use error::AuthError;
pub use guard::{GuardDecision, LandingArea};
pub use permission::PermissionEngine;
pub use session::{
    AuthenticatedSession, LoginOutcome, RefreshedAccess, SessionOrchestrator, SessionState,
};
pub use token::{Claims, TokenPair, TokenUse};
