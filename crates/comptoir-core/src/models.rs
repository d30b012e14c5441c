//! Domain models for the Comptoir auth core.
//!
//! These are the types shared across all crates.

pub mod grant;
pub mod principal;
pub mod role;
pub mod two_factor;
