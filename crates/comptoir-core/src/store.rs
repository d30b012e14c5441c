//! Credential store trait seams.
//!
//! The durable store (accounts, password hashes, TOTP secrets, backup
//! codes, grants) is an external collaborator — these traits define
//! the access patterns the core requires of it, nothing more. All
//! operations are async and fallible; implementations must distinguish
//! a missing record ([`CoreError::NotFound`]) from an unreachable
//! store ([`CoreError::StoreUnavailable`]), because only the latter is
//! retryable.

use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::grant::Grant;
use crate::models::principal::Principal;
use crate::models::two_factor::TwoFactorStatus;

#[allow(unused_imports)]
use crate::error::CoreError;

/// Account identity and password-hash access.
pub trait PrincipalStore: Send + Sync {
    fn get_by_email(&self, email: &str) -> impl Future<Output = CoreResult<Principal>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Principal>> + Send;

    /// The stored Argon2id PHC-format hash for a principal.
    fn password_hash(&self, id: Uuid) -> impl Future<Output = CoreResult<String>> + Send;

    fn update_password_hash(
        &self,
        id: Uuid,
        hash: String,
    ) -> impl Future<Output = CoreResult<()>> + Send;
}

/// Second-factor enrollment state, TOTP secrets, and backup codes.
pub trait TwoFactorStore: Send + Sync {
    fn status(&self, principal_id: Uuid)
    -> impl Future<Output = CoreResult<TwoFactorStatus>> + Send;

    fn set_status(
        &self,
        principal_id: Uuid,
        status: TwoFactorStatus,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// The stored TOTP secret (encrypted at rest when the deployment
    /// configures an encryption key).
    fn totp_secret(&self, principal_id: Uuid) -> impl Future<Output = CoreResult<String>> + Send;

    /// Persist a freshly generated secret and move the enrollment to
    /// [`TwoFactorStatus::Pending`].
    fn save_totp_secret(
        &self,
        principal_id: Uuid,
        secret: String,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Destroy the secret (2FA disabled or re-enrollment).
    fn clear_totp_secret(&self, principal_id: Uuid)
    -> impl Future<Output = CoreResult<()>> + Send;

    /// Digests of the unconsumed backup codes for a principal.
    fn backup_codes(&self, principal_id: Uuid)
    -> impl Future<Output = CoreResult<Vec<String>>> + Send;

    /// Replace the stored batch of backup-code digests.
    fn save_backup_codes(
        &self,
        principal_id: Uuid,
        digests: Vec<String>,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Atomically check-and-mark a backup code digest as consumed.
    ///
    /// Returns `true` exactly once per digest: concurrent calls with
    /// the same digest must not both succeed, so implementations need
    /// a compare-and-swap or equivalent conditional update.
    fn consume_backup_code(
        &self,
        principal_id: Uuid,
        digest: &str,
    ) -> impl Future<Output = CoreResult<bool>> + Send;
}

/// Role and per-principal permission grants.
pub trait GrantStore: Send + Sync {
    fn role_grants(&self, role_id: Uuid) -> impl Future<Output = CoreResult<Vec<Grant>>> + Send;

    /// Grants attached directly to a principal, on top of its role.
    fn principal_grants(
        &self,
        principal_id: Uuid,
    ) -> impl Future<Output = CoreResult<Vec<Grant>>> + Send;
}
