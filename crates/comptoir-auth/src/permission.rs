//! Permission engine: per-principal grant cache and decision checks.
//!
//! The cache is keyed by principal id in a concurrent map so logins
//! and logouts for different principals never contend. Each entry is a
//! complete snapshot behind an `Arc`: a reload replaces the whole set
//! in one insert, so a concurrent `can` observes either the old or the
//! fully-replaced grants, never a partial write.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use uuid::Uuid;

use comptoir_core::{CoreResult, Grant, GrantStore, Principal};

use crate::error::AuthError;
use crate::fetch::bounded;

pub struct PermissionEngine<G: GrantStore> {
    store: G,
    cache: DashMap<Uuid, Arc<HashSet<Grant>>>,
    store_timeout: Duration,
}

impl<G: GrantStore> PermissionEngine<G> {
    pub fn new(store: G, store_timeout: Duration) -> Self {
        Self {
            store,
            cache: DashMap::new(),
            store_timeout,
        }
    }

    /// Fetch a principal's effective grants (role grants plus direct
    /// grants) and replace its cache entry.
    ///
    /// Always a full replace, never a merge — stale grants must not
    /// survive a reload. Returns the number of effective grants.
    pub async fn load(&self, principal: &Principal) -> CoreResult<usize> {
        let role_grants = bounded(
            self.store_timeout,
            self.store.role_grants(principal.role_id),
        )
        .await?;
        let direct_grants = bounded(
            self.store_timeout,
            self.store.principal_grants(principal.id),
        )
        .await?;

        let grants: HashSet<Grant> = role_grants.into_iter().chain(direct_grants).collect();
        let count = grants.len();
        self.cache.insert(principal.id, Arc::new(grants));
        tracing::debug!(principal = %principal.id, grants = count, "permissions loaded");
        Ok(count)
    }

    /// Evaluate a (resource, action) pair against the cached grants.
    ///
    /// Pure decision query: the caller must have loaded the principal
    /// first. A cache miss fails with
    /// [`AuthError::PermissionsNotLoaded`] instead of fetching, so a
    /// permission check can never turn into blocking I/O.
    pub fn can(&self, principal_id: Uuid, resource: &str, action: &str) -> Result<bool, AuthError> {
        let Some(entry) = self.cache.get(&principal_id) else {
            return Err(AuthError::PermissionsNotLoaded);
        };
        Ok(entry.contains(&Grant::new(resource, action)))
    }

    /// Drop a principal's cache entry (logout, role change).
    ///
    /// Returns whether an entry existed.
    pub fn invalidate(&self, principal_id: Uuid) -> bool {
        self.cache.remove(&principal_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comptoir_core::Role;
    use comptoir_memstore::MemStore;

    fn principal(store: &MemStore) -> Principal {
        let p = Principal {
            id: Uuid::new_v4(),
            email: "user@test.com".into(),
            company_id: Some(Uuid::new_v4()),
            role_id: Uuid::new_v4(),
            role: Role::Vendeur,
        };
        store.insert_principal(p.clone(), "unused-hash".into());
        p
    }

    #[tokio::test]
    async fn check_requires_explicit_load() {
        let store = MemStore::new();
        let p = principal(&store);
        let engine = PermissionEngine::new(store, Duration::from_secs(1));

        assert!(matches!(
            engine.can(p.id, "sales", "read"),
            Err(AuthError::PermissionsNotLoaded)
        ));
    }

    #[tokio::test]
    async fn load_then_check() {
        let store = MemStore::new();
        let p = principal(&store);
        store.set_role_grants(p.role_id, vec![Grant::new("sales", "read")]);
        store.set_principal_grants(p.id, vec![Grant::new("inventory", "write")]);

        let engine = PermissionEngine::new(store, Duration::from_secs(1));
        assert_eq!(engine.load(&p).await.unwrap(), 2);

        assert!(engine.can(p.id, "sales", "read").unwrap());
        assert!(engine.can(p.id, "inventory", "write").unwrap());
        assert!(!engine.can(p.id, "sales", "delete").unwrap());
    }

    #[tokio::test]
    async fn reload_replaces_instead_of_merging() {
        let store = MemStore::new();
        let p = principal(&store);
        store.set_role_grants(p.role_id, vec![Grant::new("sales", "read")]);

        let engine = PermissionEngine::new(store.clone(), Duration::from_secs(1));
        engine.load(&p).await.unwrap();
        assert!(engine.can(p.id, "sales", "read").unwrap());

        // Revoke the role grant; the reload must not leak the old one.
        store.set_role_grants(p.role_id, vec![Grant::new("sales", "list")]);
        engine.load(&p).await.unwrap();

        assert!(!engine.can(p.id, "sales", "read").unwrap());
        assert!(engine.can(p.id, "sales", "list").unwrap());
    }

    #[tokio::test]
    async fn invalidate_drops_entry() {
        let store = MemStore::new();
        let p = principal(&store);
        let engine = PermissionEngine::new(store, Duration::from_secs(1));

        engine.load(&p).await.unwrap();
        assert!(engine.invalidate(p.id));
        assert!(!engine.invalidate(p.id));
        assert!(matches!(
            engine.can(p.id, "sales", "read"),
            Err(AuthError::PermissionsNotLoaded)
        ));
    }
}
