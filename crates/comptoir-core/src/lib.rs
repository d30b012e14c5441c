//! Comptoir Core — domain models, store seams, and shared errors for
//! the authentication/authorization core.
//!
//! This crate holds no crypto and performs no I/O: it defines what a
//! principal, role, grant, and two-factor enrollment are, plus the
//! trait seams through which the core consumes the external credential
//! store and email dispatcher.

pub mod email;
pub mod error;
pub mod models;
pub mod store;

pub use email::{EmailDispatch, EmailMessage, EmailReceipt};
pub use error::{CoreError, CoreResult};
pub use models::grant::Grant;
pub use models::principal::Principal;
pub use models::role::Role;
pub use models::two_factor::TwoFactorStatus;
pub use store::{GrantStore, PrincipalStore, TwoFactorStore};
