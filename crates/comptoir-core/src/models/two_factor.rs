//! Two-factor enrollment domain model.

use serde::{Deserialize, Serialize};

/// Per-principal second-factor enrollment state.
///
/// Transitions: `Unenrolled -> Pending` (secret generated, not yet
/// confirmed) `-> Enrolled` (first valid code accepted) `-> Disabled`.
/// Only `Enrolled` triggers a second-factor challenge at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TwoFactorStatus {
    Unenrolled,
    Pending,
    Enrolled,
    Disabled,
}

impl TwoFactorStatus {
    /// Whether a login must pass a second-factor challenge.
    pub fn requires_challenge(&self) -> bool {
        matches!(self, TwoFactorStatus::Enrolled)
    }
}
