//! In-memory implementation of the Comptoir credential-store traits.
//!
//! The production store is an external system; this crate is its
//! reference double for integration tests and embedded demos. It
//! honors the same contracts, in particular the atomic check-and-mark
//! of backup-code consumption: all state sits behind one mutex, so two
//! concurrent consumers of the same code observe exactly one success.
//!
//! Failure injection (`fail_next`) makes the retry and timeout paths
//! of the orchestrator testable without a real flaky backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use comptoir_core::email::{EmailDispatch, EmailMessage, EmailReceipt};
use comptoir_core::error::{CoreError, CoreResult};
use comptoir_core::models::grant::Grant;
use comptoir_core::models::principal::Principal;
use comptoir_core::models::two_factor::TwoFactorStatus;
use comptoir_core::store::{GrantStore, PrincipalStore, TwoFactorStore};

#[derive(Debug, Default)]
struct TwoFactorEntry {
    status: Option<TwoFactorStatus>,
    secret: Option<String>,
}

#[derive(Debug)]
struct BackupCodeRow {
    digest: String,
    consumed: bool,
}

#[derive(Debug, Default)]
struct State {
    principals: HashMap<Uuid, Principal>,
    emails: HashMap<String, Uuid>,
    password_hashes: HashMap<Uuid, String>,
    two_factor: HashMap<Uuid, TwoFactorEntry>,
    backup_codes: HashMap<Uuid, Vec<BackupCodeRow>>,
    role_grants: HashMap<Uuid, Vec<Grant>>,
    principal_grants: HashMap<Uuid, Vec<Grant>>,
    fail_budget: u32,
}

/// Shared-handle in-memory store. Cloning yields another handle to the
/// same state.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    inner: Arc<Mutex<State>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an account with its stored password hash.
    pub fn insert_principal(&self, principal: Principal, password_hash: String) {
        let mut state = self.lock();
        state.emails.insert(principal.email.clone(), principal.id);
        state.password_hashes.insert(principal.id, password_hash);
        state.principals.insert(principal.id, principal);
    }

    pub fn set_role_grants(&self, role_id: Uuid, grants: Vec<Grant>) {
        self.lock().role_grants.insert(role_id, grants);
    }

    pub fn set_principal_grants(&self, principal_id: Uuid, grants: Vec<Grant>) {
        self.lock().principal_grants.insert(principal_id, grants);
    }

    /// Make the next `count` store calls fail with `StoreUnavailable`.
    pub fn fail_next(&self, count: u32) {
        self.lock().fail_budget = count;
    }

    /// Digests still unconsumed for a principal. Test inspection aid.
    pub fn unconsumed_backup_codes(&self, principal_id: Uuid) -> usize {
        self.lock()
            .backup_codes
            .get(&principal_id)
            .map(|rows| rows.iter().filter(|r| !r.consumed).count())
            .unwrap_or(0)
    }

    fn take_injected_failure(state: &mut State) -> CoreResult<()> {
        if state.fail_budget > 0 {
            state.fail_budget -= 1;
            return Err(CoreError::StoreUnavailable("injected failure".into()));
        }
        Ok(())
    }

    fn not_found(entity: &str, id: impl ToString) -> CoreError {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl PrincipalStore for MemStore {
    async fn get_by_email(&self, email: &str) -> CoreResult<Principal> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        state
            .emails
            .get(email)
            .and_then(|id| state.principals.get(id))
            .cloned()
            .ok_or_else(|| Self::not_found("principal", email))
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<Principal> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        state
            .principals
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found("principal", id))
    }

    async fn password_hash(&self, id: Uuid) -> CoreResult<String> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        state
            .password_hashes
            .get(&id)
            .cloned()
            .ok_or_else(|| Self::not_found("password", id))
    }

    async fn update_password_hash(&self, id: Uuid, hash: String) -> CoreResult<()> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        if !state.principals.contains_key(&id) {
            return Err(Self::not_found("principal", id));
        }
        state.password_hashes.insert(id, hash);
        Ok(())
    }
}

impl TwoFactorStore for MemStore {
    async fn status(&self, principal_id: Uuid) -> CoreResult<TwoFactorStatus> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        Ok(state
            .two_factor
            .get(&principal_id)
            .and_then(|e| e.status)
            .unwrap_or(TwoFactorStatus::Unenrolled))
    }

    async fn set_status(&self, principal_id: Uuid, status: TwoFactorStatus) -> CoreResult<()> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        state.two_factor.entry(principal_id).or_default().status = Some(status);
        Ok(())
    }

    async fn totp_secret(&self, principal_id: Uuid) -> CoreResult<String> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        state
            .two_factor
            .get(&principal_id)
            .and_then(|e| e.secret.clone())
            .ok_or_else(|| Self::not_found("totp secret", principal_id))
    }

    async fn save_totp_secret(&self, principal_id: Uuid, secret: String) -> CoreResult<()> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        let entry = state.two_factor.entry(principal_id).or_default();
        entry.secret = Some(secret);
        entry.status = Some(TwoFactorStatus::Pending);
        Ok(())
    }

    async fn clear_totp_secret(&self, principal_id: Uuid) -> CoreResult<()> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        if let Some(entry) = state.two_factor.get_mut(&principal_id) {
            entry.secret = None;
        }
        Ok(())
    }

    async fn backup_codes(&self, principal_id: Uuid) -> CoreResult<Vec<String>> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        Ok(state
            .backup_codes
            .get(&principal_id)
            .map(|rows| {
                rows.iter()
                    .filter(|r| !r.consumed)
                    .map(|r| r.digest.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn save_backup_codes(&self, principal_id: Uuid, digests: Vec<String>) -> CoreResult<()> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        let rows = digests
            .into_iter()
            .map(|digest| BackupCodeRow {
                digest,
                consumed: false,
            })
            .collect();
        state.backup_codes.insert(principal_id, rows);
        Ok(())
    }

    async fn consume_backup_code(&self, principal_id: Uuid, digest: &str) -> CoreResult<bool> {
        // Check-and-mark under the single state lock: exactly one of
        // two concurrent consumers of the same digest sees `true`.
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        let Some(rows) = state.backup_codes.get_mut(&principal_id) else {
            return Ok(false);
        };
        match rows.iter_mut().find(|r| r.digest == digest && !r.consumed) {
            Some(row) => {
                row.consumed = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl GrantStore for MemStore {
    async fn role_grants(&self, role_id: Uuid) -> CoreResult<Vec<Grant>> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        Ok(state.role_grants.get(&role_id).cloned().unwrap_or_default())
    }

    async fn principal_grants(&self, principal_id: Uuid) -> CoreResult<Vec<Grant>> {
        let mut state = self.lock();
        Self::take_injected_failure(&mut state)?;
        Ok(state
            .principal_grants
            .get(&principal_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Recording email dispatcher for tests.
#[derive(Debug, Clone, Default)]
pub struct MemMailer {
    inner: Arc<Mutex<MailerState>>,
}

#[derive(Debug, Default)]
struct MailerState {
    sent: Vec<EmailMessage>,
    fail: bool,
}

impl MemMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send` fail with `DeliveryError`.
    pub fn fail_deliveries(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail = true;
    }

    pub fn sent_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .len()
    }
}

impl EmailDispatch for MemMailer {
    async fn send(&self, message: &EmailMessage) -> CoreResult<EmailReceipt> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if state.fail {
            return Err(CoreError::DeliveryError("mailer offline".into()));
        }
        state.sent.push(message.clone());
        Ok(EmailReceipt {
            message_id: format!("mem-{}", state.sent.len()),
        })
    }
}
