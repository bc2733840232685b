//! # Record Store
//!
//! The two lock-guarded collections behind the cache, plus the cluster
//! scope slot, and the lazy population engine that fills them from the
//! backing store. Each collection has its own lock and no code path holds
//! both at once. A population fetch runs while holding the collection's
//! lock, so concurrent readers of that collection queue behind the refresh.

use crate::model::{AssocRecord, UserRecord};
use crate::storage::{AcctStorage, IdentityResolver};
use anyhow::{bail, Result};
use parking_lot::Mutex;
use tracing::{debug, error};

/// Shared mutable state of the cache: `None` means never populated.
pub(crate) struct CacheStore {
    pub(crate) assocs: Mutex<Option<Vec<AssocRecord>>>,
    pub(crate) users: Mutex<Option<Vec<UserRecord>>>,
    pub(crate) scope: Mutex<Option<String>>,
}

impl CacheStore {
    pub(crate) fn new() -> Self {
        Self {
            assocs: Mutex::new(None),
            users: Mutex::new(None),
            scope: Mutex::new(None),
        }
    }

    /// Current cluster scope; `None` means the cache is shared.
    pub(crate) fn scope(&self) -> Option<String> {
        self.scope.lock().clone()
    }

    /// Establish the cluster scope once; later calls are no-ops until the
    /// scope is discarded by teardown.
    pub(crate) fn set_scope_if_unset(&self, name: Option<&str>) {
        let mut scope = self.scope.lock();
        if scope.is_none() {
            *scope = name.map(str::to_owned);
        }
    }

    /// Discard both collections and the scope, returning to the
    /// never-populated state.
    pub(crate) fn clear(&self) {
        *self.assocs.lock() = None;
        *self.users.lock() = None;
        *self.scope.lock() = None;
    }

    /// Populate the association collection if it was never populated.
    pub(crate) fn ensure_assocs(
        &self,
        storage: &dyn AcctStorage,
        identity: &dyn IdentityResolver,
        enforce: bool,
    ) -> Result<()> {
        let mut slot = self.assocs.lock();
        if slot.is_none() {
            refill_assocs(&mut slot, self.scope().as_deref(), storage, identity, enforce)?;
        }
        Ok(())
    }

    /// Populate the user collection if it was never populated.
    pub(crate) fn ensure_users(&self, storage: &dyn AcctStorage, enforce: bool) -> Result<()> {
        let mut slot = self.users.lock();
        if slot.is_none() {
            refill_users(&mut slot, storage, enforce)?;
        }
        Ok(())
    }

    /// Unconditionally re-fetch the association collection.
    pub(crate) fn repopulate_assocs(
        &self,
        storage: &dyn AcctStorage,
        identity: &dyn IdentityResolver,
        enforce: bool,
    ) -> Result<()> {
        let mut slot = self.assocs.lock();
        refill_assocs(&mut slot, self.scope().as_deref(), storage, identity, enforce)
    }

    /// Unconditionally re-fetch the user collection.
    pub(crate) fn repopulate_users(&self, storage: &dyn AcctStorage, enforce: bool) -> Result<()> {
        let mut slot = self.users.lock();
        refill_users(&mut slot, storage, enforce)
    }
}

/// Replace `slot` with a fresh association snapshot.
///
/// The prior collection is discarded before the fetch, so a failed fetch
/// leaves the collection unpopulated. A missing snapshot is an error only
/// under enforcement. After a successful fetch, records carrying a user
/// name but no uid get a best-effort identity lookup.
fn refill_assocs(
    slot: &mut Option<Vec<AssocRecord>>,
    scope: Option<&str>,
    storage: &dyn AcctStorage,
    identity: &dyn IdentityResolver,
    enforce: bool,
) -> Result<()> {
    *slot = None;

    let fetched = match storage.fetch_assocs(scope) {
        Ok(fetched) => fetched,
        Err(err) => {
            error!(error = %err, "association snapshot fetch failed");
            None
        }
    };
    let Some(mut assocs) = fetched else {
        if enforce {
            bail!("no association snapshot available from the backing store");
        }
        return Ok(());
    };

    for assoc in &mut assocs {
        if assoc.uid.is_some() {
            continue;
        }
        if let Some(user) = &assoc.user {
            assoc.uid = identity.uid_for(user);
        }
    }

    debug!(count = assocs.len(), "populated association cache");
    *slot = Some(assocs);
    Ok(())
}

/// Replace `slot` with a fresh user snapshot. No enrichment.
fn refill_users(
    slot: &mut Option<Vec<UserRecord>>,
    storage: &dyn AcctStorage,
    enforce: bool,
) -> Result<()> {
    *slot = None;

    let fetched = match storage.fetch_users() {
        Ok(fetched) => fetched,
        Err(err) => {
            error!(error = %err, "user snapshot fetch failed");
            None
        }
    };
    let Some(users) = fetched else {
        if enforce {
            bail!("no user snapshot available from the backing store");
        }
        return Ok(());
    };

    debug!(count = users.len(), "populated user cache");
    *slot = Some(users);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemStorage, NoIdentity, StaticIdentity};

    #[test]
    fn population_enriches_unresolved_uids() {
        let store = CacheStore::new();
        let storage = MemStorage::default().with_assocs(vec![
            AssocRecord::new("ada", "phys", "tundra").with_id(1),
            AssocRecord::new("grace", "chem", "tundra").with_id(2).with_uid(42),
        ]);
        let identity = StaticIdentity::default().with_user("ada", 500);

        store.ensure_assocs(&storage, &identity, true).unwrap();

        let slot = store.assocs.lock();
        let assocs = slot.as_ref().unwrap();
        assert_eq!(assocs[0].uid, Some(500));
        // Already-resolved uids are left alone.
        assert_eq!(assocs[1].uid, Some(42));
    }

    #[test]
    fn unknown_names_stay_unresolved() {
        let store = CacheStore::new();
        let storage = MemStorage::default()
            .with_assocs(vec![AssocRecord::new("nobody", "phys", "tundra").with_id(1)]);

        store.ensure_assocs(&storage, &NoIdentity, true).unwrap();

        let slot = store.assocs.lock();
        assert_eq!(slot.as_ref().unwrap()[0].uid, None);
    }

    #[test]
    fn scoped_population_filters_the_fetch() {
        let store = CacheStore::new();
        store.set_scope_if_unset(Some("tundra"));
        let storage = MemStorage::default().with_assocs(vec![
            AssocRecord::new("ada", "phys", "tundra").with_id(1),
            AssocRecord::new("ada", "phys", "mesa").with_id(2),
        ]);

        store.ensure_assocs(&storage, &NoIdentity, true).unwrap();

        let slot = store.assocs.lock();
        assert_eq!(slot.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn missing_snapshot_is_an_error_only_under_enforcement() {
        let store = CacheStore::new();
        let storage = MemStorage::unavailable();

        assert!(store.ensure_users(&storage, false).is_ok());
        assert!(store.users.lock().is_none());
        assert!(store.ensure_users(&storage, true).is_err());
    }

    #[test]
    fn scope_is_established_once() {
        let store = CacheStore::new();
        store.set_scope_if_unset(Some("tundra"));
        store.set_scope_if_unset(Some("mesa"));
        assert_eq!(store.scope().as_deref(), Some("tundra"));

        store.clear();
        assert_eq!(store.scope(), None);
        store.set_scope_if_unset(Some("mesa"));
        assert_eq!(store.scope().as_deref(), Some("mesa"));
    }

    #[test]
    fn repopulation_discards_the_prior_collection() {
        let store = CacheStore::new();
        let first = MemStorage::default()
            .with_assocs(vec![AssocRecord::new("ada", "phys", "tundra").with_id(1)]);
        store.ensure_assocs(&first, &NoIdentity, true).unwrap();

        let second = MemStorage::default().with_assocs(vec![
            AssocRecord::new("grace", "chem", "tundra").with_id(7),
            AssocRecord::new("ada", "phys", "tundra").with_id(8),
        ]);
        store.repopulate_assocs(&second, &NoIdentity, true).unwrap();

        let slot = store.assocs.lock();
        let assocs = slot.as_ref().unwrap();
        assert_eq!(assocs.len(), 2);
        assert_eq!(assocs[0].id, Some(7));
    }
}
