//! Session orchestration: the login / second-factor / token-issuance
//! state machine.
//!
//! The orchestrator sequences the password check, the optional TOTP
//! challenge, token issuance, and the permission preload. It holds no
//! per-session mutable state — transitions for a single session are
//! serialized by the caller, and concurrent logins for one principal
//! simply produce independent token pairs.
//!
//! Store reads are bounded and retried once with backoff; writes and
//! password submissions never retry (a retried login would amplify
//! brute-force attempts).

use std::sync::OnceLock;

use regex::Regex;
use uuid::Uuid;

use comptoir_core::{
    CoreError, CoreResult, EmailDispatch, EmailMessage, EmailReceipt, GrantStore, Principal,
    PrincipalStore, TwoFactorStatus, TwoFactorStore,
};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::fetch::{bounded, retry_read};
use crate::password;
use crate::permission::PermissionEngine;
use crate::token::{self, TokenPair};
use crate::totp;

/// Session lifecycle states.
///
/// `SessionExpired` exists so the machine can record why a session
/// ended, but it is observably identical to `Anonymous`: callers
/// branching on [`SessionState::observed`] cannot tell them apart and
/// both force a re-login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    CredentialsSubmitted,
    TwoFactorRequired,
    TwoFactorVerified,
    Authenticated,
    Refreshing,
    SessionExpired,
}

impl SessionState {
    /// The state as any caller observes it.
    pub fn observed(&self) -> SessionState {
        match self {
            SessionState::SessionExpired => SessionState::Anonymous,
            other => *other,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.observed(), SessionState::Authenticated)
    }
}

/// A completed authentication: token pair plus the principal snapshot
/// the claims were taken from.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub tokens: TokenPair,
    pub principal: Principal,
    /// Number of grants preloaded into the permission cache.
    pub preloaded_grants: usize,
}

/// Result of a password login: either straight through to tokens, or
/// a pending second-factor challenge.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated(AuthenticatedSession),
    TwoFactorRequired { challenge_token: String },
}

/// A freshly minted access token from a refresh.
#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub access_token: String,
    pub expires_in: u64,
}

/// A pending-to-enrolled 2FA confirmation: the one-time backup codes,
/// shown to the principal exactly once.
#[derive(Debug)]
pub struct ConfirmedEnrollment {
    pub backup_codes: Vec<String>,
}

/// A generated enrollment ready for the authenticator app.
#[derive(Debug)]
pub struct TwoFactorSetup {
    pub secret_base32: String,
    pub otpauth_url: String,
    pub qr_png: Vec<u8>,
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"))
}

/// Map a missing account to the generic credentials failure so login
/// errors never reveal whether an email exists.
fn generic_credentials(err: CoreError) -> CoreError {
    match err {
        CoreError::NotFound { .. } => AuthError::InvalidCredentials.into(),
        other => other,
    }
}

pub struct SessionOrchestrator<P, T, G>
where
    P: PrincipalStore,
    T: TwoFactorStore,
    G: GrantStore,
{
    principals: P,
    two_factor: T,
    permissions: PermissionEngine<G>,
    config: AuthConfig,
}

impl<P, T, G> SessionOrchestrator<P, T, G>
where
    P: PrincipalStore,
    T: TwoFactorStore,
    G: GrantStore,
{
    pub fn new(principals: P, two_factor: T, grants: G, config: AuthConfig) -> Self {
        let permissions = PermissionEngine::new(grants, config.store_timeout);
        Self {
            principals,
            two_factor,
            permissions,
            config,
        }
    }

    /// The permission engine preloaded by this orchestrator, for
    /// downstream `can` checks.
    pub fn permissions(&self) -> &PermissionEngine<G> {
        &self.permissions
    }

    async fn read<R, F, Fut>(&self, op: F) -> CoreResult<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoreResult<R>>,
    {
        retry_read(self.config.store_timeout, self.config.retry_backoff, op).await
    }

    /// Password login. Invalid email format and empty password fail
    /// fast, before any store round trip.
    pub async fn login(&self, email: &str, submitted_password: &str) -> CoreResult<LoginOutcome> {
        if !email_regex().is_match(email) || submitted_password.is_empty() {
            return Err(AuthError::InvalidCredentials.into());
        }

        let principal = self
            .read(|| self.principals.get_by_email(email))
            .await
            .map_err(generic_credentials)?;
        let hash = self
            .read(|| self.principals.password_hash(principal.id))
            .await
            .map_err(generic_credentials)?;

        let valid = password::verify_password(
            submitted_password,
            &hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        let status = self.read(|| self.two_factor.status(principal.id)).await?;
        if status.requires_challenge() {
            let challenge_token = token::issue_challenge(principal.id, &self.config)?;
            tracing::info!(principal = %principal.id, "password accepted, second factor required");
            return Ok(LoginOutcome::TwoFactorRequired { challenge_token });
        }

        self.finalize(&principal)
            .await
            .map(LoginOutcome::Authenticated)
    }

    /// Complete a pending 2FA challenge with a TOTP code or an unused
    /// backup code.
    pub async fn verify_two_factor(
        &self,
        challenge_token: &str,
        code: &str,
    ) -> CoreResult<AuthenticatedSession> {
        let principal_id = token::verify_challenge(challenge_token, &self.config)?;
        let principal = self.read(|| self.principals.get_by_id(principal_id)).await?;

        let status = self.read(|| self.two_factor.status(principal_id)).await?;
        if status != TwoFactorStatus::Enrolled {
            return Err(AuthError::TwoFactorNotEnrolled.into());
        }

        let secret = self.load_secret(principal_id).await?;
        if totp::verify_code(&secret, code) {
            return self.finalize(&principal).await;
        }

        // Fall back to a backup code. Consumption is an atomic
        // check-and-mark in the store and is never retried.
        let digest = totp::hash_backup_code(code);
        let consumed = bounded(
            self.config.store_timeout,
            self.two_factor.consume_backup_code(principal_id, &digest),
        )
        .await?;
        if consumed {
            tracing::info!(principal = %principal_id, "backup code consumed");
            return self.finalize(&principal).await;
        }

        Err(AuthError::InvalidTotpCode.into())
    }

    /// Token issuance plus eager permission preload. Both must succeed
    /// or the principal remains unauthenticated — on a token failure
    /// the freshly loaded cache entry is rolled back so no
    /// partial-authenticated state is observable.
    async fn finalize(&self, principal: &Principal) -> CoreResult<AuthenticatedSession> {
        let preloaded_grants = self.permissions.load(principal).await?;

        let tokens = match token::issue_pair(principal, principal.role.as_str(), &self.config) {
            Ok(pair) => pair,
            Err(err) => {
                self.permissions.invalidate(principal.id);
                return Err(err.into());
            }
        };

        tracing::info!(
            principal = %principal.id,
            role = %principal.role,
            grants = preloaded_grants,
            "session authenticated"
        );
        Ok(AuthenticatedSession {
            tokens,
            principal: principal.clone(),
            preloaded_grants,
        })
    }

    /// Exchange a valid refresh token for a fresh access token, with
    /// no password or second-factor re-check.
    ///
    /// An expired or invalid refresh token fails with
    /// [`AuthError::SessionExpired`] — one error kind for both causes,
    /// forcing a re-login without disclosing which check failed.
    pub async fn refresh(&self, refresh_token: &str) -> CoreResult<RefreshedAccess> {
        let claims = token::verify_refresh(refresh_token, &self.config).map_err(|err| match err {
            AuthError::TokenExpired | AuthError::InvalidSignature(_) => AuthError::SessionExpired,
            other => other,
        })?;

        let access_token = token::refresh_access_token(&claims, &self.config)?;
        Ok(RefreshedAccess {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
        })
    }

    /// End a session: drop the principal's permission cache entry.
    ///
    /// Issued tokens are not revocable server-side; they die at expiry
    /// and the client discards its copies.
    pub fn logout(&self, principal_id: Uuid) {
        let had_entry = self.permissions.invalidate(principal_id);
        tracing::info!(principal = %principal_id, cached = had_entry, "session ended");
    }

    /// Verify the current password and store a fresh Argon2id hash of
    /// the new one. Neither step is retried.
    pub async fn change_password(
        &self,
        principal_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> CoreResult<()> {
        let hash = bounded(
            self.config.store_timeout,
            self.principals.password_hash(principal_id),
        )
        .await?;
        let valid =
            password::verify_password(current_password, &hash, self.config.pepper.as_deref())?;
        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }

        if new_password.len() < self.config.min_password_length {
            return Err(AuthError::WeakPassword {
                min: self.config.min_password_length,
            }
            .into());
        }

        let new_hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        bounded(
            self.config.store_timeout,
            self.principals.update_password_hash(principal_id, new_hash),
        )
        .await
    }

    /// Begin 2FA enrollment: generate and persist a secret, and return
    /// it with its provisioning URI and QR image. The enrollment stays
    /// `Pending` until the first valid code confirms it.
    pub async fn setup_two_factor(&self, email: &str) -> CoreResult<TwoFactorSetup> {
        let principal = self.read(|| self.principals.get_by_email(email)).await?;

        let enrollment = totp::generate_enrollment(&self.config.totp_issuer, &principal.email)?;
        let qr_png = totp::render_provisioning_png(&enrollment.otpauth_url)?;

        let stored = self.seal_secret(&enrollment.secret_base32)?;
        bounded(
            self.config.store_timeout,
            self.two_factor.save_totp_secret(principal.id, stored),
        )
        .await?;

        tracing::info!(principal = %principal.id, "second-factor enrollment pending");
        Ok(TwoFactorSetup {
            secret_base32: enrollment.secret_base32,
            otpauth_url: enrollment.otpauth_url,
            qr_png,
        })
    }

    /// Confirm a pending enrollment with its first valid code. Moves
    /// the enrollment to `Enrolled` and issues the backup-code batch.
    pub async fn confirm_two_factor(
        &self,
        principal_id: Uuid,
        code: &str,
    ) -> CoreResult<ConfirmedEnrollment> {
        let status = self.read(|| self.two_factor.status(principal_id)).await?;
        if status != TwoFactorStatus::Pending {
            return Err(AuthError::TwoFactorNotEnrolled.into());
        }

        let secret = self.load_secret(principal_id).await?;
        if !totp::verify_code(&secret, code) {
            return Err(AuthError::InvalidTotpCode.into());
        }

        let backup_codes = totp::generate_backup_codes(self.config.backup_code_count);
        let digests = backup_codes.iter().map(|c| totp::hash_backup_code(c)).collect();
        bounded(
            self.config.store_timeout,
            self.two_factor.save_backup_codes(principal_id, digests),
        )
        .await?;
        bounded(
            self.config.store_timeout,
            self.two_factor
                .set_status(principal_id, TwoFactorStatus::Enrolled),
        )
        .await?;

        tracing::info!(principal = %principal_id, "second factor enrolled");
        Ok(ConfirmedEnrollment { backup_codes })
    }

    /// Disable 2FA: destroy the secret and the remaining backup codes.
    pub async fn disable_two_factor(&self, principal_id: Uuid) -> CoreResult<()> {
        bounded(
            self.config.store_timeout,
            self.two_factor.clear_totp_secret(principal_id),
        )
        .await?;
        bounded(
            self.config.store_timeout,
            self.two_factor.save_backup_codes(principal_id, Vec::new()),
        )
        .await?;
        bounded(
            self.config.store_timeout,
            self.two_factor
                .set_status(principal_id, TwoFactorStatus::Disabled),
        )
        .await?;
        tracing::info!(principal = %principal_id, "second factor disabled");
        Ok(())
    }

    /// Hand a pre-rendered message to the email dispatcher, bounded by
    /// the store timeout. Failures are logged as warnings and surfaced
    /// as the retryable [`CoreError::DeliveryError`]; callers for whom
    /// the mail is non-critical may drop the error.
    pub async fn notify<E: EmailDispatch>(
        &self,
        dispatch: &E,
        message: &EmailMessage,
    ) -> CoreResult<EmailReceipt> {
        let result = match tokio::time::timeout(self.config.store_timeout, dispatch.send(message))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CoreError::DeliveryError(format!(
                "dispatch exceeded {}ms",
                self.config.store_timeout.as_millis()
            ))),
        };
        if let Err(err) = &result {
            tracing::warn!(error = %err, subject = %message.subject, "email handoff failed");
        }
        result
    }

    fn seal_secret(&self, secret_base32: &str) -> CoreResult<String> {
        match &self.config.totp_encryption_key {
            Some(key) => Ok(totp::encrypt_secret(key, secret_base32)?),
            None => Ok(secret_base32.to_string()),
        }
    }

    async fn load_secret(&self, principal_id: Uuid) -> CoreResult<String> {
        let stored = self.read(|| self.two_factor.totp_secret(principal_id)).await?;
        match &self.config.totp_encryption_key {
            Some(key) => Ok(totp::decrypt_secret(key, &stored)?),
            None => Ok(stored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_session_observed_as_anonymous() {
        assert_eq!(
            SessionState::SessionExpired.observed(),
            SessionState::Anonymous
        );
        assert!(!SessionState::SessionExpired.is_authenticated());
        assert!(SessionState::Authenticated.is_authenticated());
    }

    #[test]
    fn email_fast_path_rejects_garbage() {
        let re = email_regex();
        assert!(re.is_match("user@test.com"));
        assert!(!re.is_match("user"));
        assert!(!re.is_match("user@"));
        assert!(!re.is_match("@test.com"));
        assert!(!re.is_match("user@test"));
        assert!(!re.is_match("user name@test.com"));
    }
}
