//! Authentication configuration.

use std::time::Duration;

/// Configuration for the authentication core.
///
/// Access and refresh tokens are signed with separate Ed25519 key
/// pairs so a leaked access token can never be replayed in the refresh
/// domain.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for access-token signing.
    pub access_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for access-token verification.
    pub access_public_key_pem: String,
    /// PEM-encoded Ed25519 private key for refresh-token signing.
    pub refresh_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for refresh-token verification.
    pub refresh_public_key_pem: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    pub refresh_token_lifetime_secs: u64,
    /// 2FA challenge token lifetime in seconds (default: 300 = 5 minutes).
    pub challenge_lifetime_secs: u64,
    /// Token issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Optional pepper prepended to passwords before Argon2id hashing
    /// and verification.
    pub pepper: Option<String>,
    /// Minimum password length for the change-password policy.
    pub min_password_length: usize,
    /// Issuer name shown in authenticator apps.
    pub totp_issuer: String,
    /// Backup codes generated per enrollment (default: 10).
    pub backup_code_count: usize,
    /// 256-bit AES-GCM key for encrypting TOTP secrets at rest.
    /// `None` stores secrets unencrypted.
    pub totp_encryption_key: Option<[u8; 32]>,
    /// Upper bound on any single credential-store or email call.
    pub store_timeout: Duration,
    /// Pause before the single retry of an idempotent store read.
    pub retry_backoff: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_private_key_pem: String::new(),
            access_public_key_pem: String::new(),
            refresh_private_key_pem: String::new(),
            refresh_public_key_pem: String::new(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 2_592_000,
            challenge_lifetime_secs: 300,
            jwt_issuer: "comptoir".into(),
            pepper: None,
            min_password_length: 12,
            totp_issuer: "Comptoir".into(),
            backup_code_count: 10,
            totp_encryption_key: None,
            store_timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(150),
        }
    }
}
