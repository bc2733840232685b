//! # Assoc Cache
//!
//! An in-process authorization cache for a cluster resource manager. It
//! answers "which association/user record governs this request" without a
//! backing-store round trip on every scheduling or accounting decision.
//!
//! The cache holds two lazily populated collections: associations
//! (user, account, cluster, partition tuples carrying resource limits)
//! and users (identity, default account, admin level, coordinator
//! rights). Both are queried with cascading partial-match fallback and
//! kept current by batched add/modify/remove updates pushed from
//! upstream.

pub mod config;
pub mod model;
pub mod query;
pub mod storage;
pub mod store;
pub mod update;

pub use config::CacheConfig;
pub use model::{AdminLevel, AssocRecord, Limit, UserRecord};
pub use query::AssocQuery;
pub use storage::{AcctStorage, IdentityResolver, MemStorage, NoIdentity, StaticIdentity};
pub use update::{AssocUpdates, BatchOutcome, MergeDisposition, UpdateKind, UserUpdates};

use anyhow::{anyhow, bail, Result};
use store::CacheStore;

/// Main API for association/user resolution.
///
/// One instance per owning component; lifecycle is tied to the owner, and
/// independent instances can coexist (as in tests). All methods take
/// `&self`; the two collections are guarded by their own internal locks
/// and no code path holds both at once. Callers only ever receive copies
/// of cached records, never references into the cache's storage.
pub struct AssocCache {
    store: CacheStore,
    storage: Box<dyn AcctStorage>,
    identity: Box<dyn IdentityResolver>,
    config: CacheConfig,
}

impl AssocCache {
    /// Create an unpopulated cache owning its collaborators.
    pub fn new<S, I>(config: CacheConfig, storage: S, identity: I) -> Self
    where
        S: AcctStorage + 'static,
        I: IdentityResolver + 'static,
    {
        Self {
            store: CacheStore::new(),
            storage: Box::new(storage),
            identity: Box::new(identity),
            config,
        }
    }

    /// Establish the cluster scope (once) and populate whichever
    /// collection is not yet populated. The first hard population failure
    /// aborts; under `enforce` a missing snapshot is a hard failure.
    pub fn init(&self, enforce: bool) -> Result<()> {
        self.store
            .set_scope_if_unset(self.config.cluster_name.as_deref());
        self.store
            .ensure_assocs(self.storage.as_ref(), self.identity.as_ref(), enforce)?;
        self.store.ensure_users(self.storage.as_ref(), enforce)?;
        Ok(())
    }

    /// Discard both collections and the cluster scope. A later [`init`]
    /// is valid and starts from scratch.
    ///
    /// [`init`]: AssocCache::init
    pub fn fini(&self) {
        self.store.clear();
    }

    /// Re-fetch both collections from the backing store, replacing
    /// whatever is cached.
    pub fn refresh(&self, enforce: bool) -> Result<()> {
        self.store
            .repopulate_assocs(self.storage.as_ref(), self.identity.as_ref(), enforce)?;
        self.store.repopulate_users(self.storage.as_ref(), enforce)
    }

    /// Cluster scope currently in effect; `None` while shared or torn
    /// down.
    pub fn cluster_scope(&self) -> Option<String> {
        self.store.scope()
    }

    /// Resolve the association governing `query`.
    ///
    /// Populates the association collection on first use. An id-keyed
    /// query matches on id alone; otherwise a missing account is resolved
    /// through the caller's default account (a user lookup on `uid`) and a
    /// missing cluster defaults to the process scope before the cascade
    /// runs. Returns a full copy of the matched record; back-filling the
    /// caller's fields is the explicit [`AssocQuery::merged_with`] step.
    ///
    /// With `enforce`, no-match and not-enough-information are errors;
    /// without it they are `Ok(None)`.
    pub fn resolve_assoc(&self, query: &AssocQuery, enforce: bool) -> Result<Option<AssocRecord>> {
        self.store
            .ensure_assocs(self.storage.as_ref(), self.identity.as_ref(), enforce)?;

        {
            let slot = self.store.assocs.lock();
            let empty = slot.as_ref().is_none_or(|a| a.is_empty());
            if empty && !enforce {
                return Ok(None);
            }
        }

        let mut query = query.clone();
        if query.id.is_none() {
            if query.acct.is_none() {
                let Some(uid) = query.uid else {
                    if enforce {
                        bail!("not enough information to resolve an association");
                    }
                    return Ok(None);
                };
                let user = match self.resolve_user(uid, enforce) {
                    Ok(user) => user,
                    Err(err) => {
                        if enforce {
                            return Err(err);
                        }
                        return Ok(None);
                    }
                };
                query.user = Some(user.name);
                query.acct = user.default_acct;
            }
            if query.cluster.is_none() {
                // Shared caches leave the cluster to come from the match.
                query.cluster = self.store.scope();
            }
        }

        let scoped = self.store.scope().is_some();
        let slot = self.store.assocs.lock();
        let Some(assocs) = slot.as_ref() else {
            if enforce {
                bail!("association cache is unpopulated");
            }
            return Ok(None);
        };
        match query::find_assoc(assocs, &query, scoped) {
            Some(idx) => Ok(Some(assocs[idx].clone())),
            None if enforce => Err(anyhow!("no association matches {:?}", query)),
            None => Ok(None),
        }
    }

    /// Resolve a user by uid, returning a full copy of the record
    /// (coordinator accounts included).
    ///
    /// `enforce` governs population only; a lookup miss is always an
    /// error. Callers wanting a soft lookup handle the error themselves.
    pub fn resolve_user(&self, uid: u32, enforce: bool) -> Result<UserRecord> {
        self.store.ensure_users(self.storage.as_ref(), enforce)?;

        let slot = self.store.users.lock();
        let Some(users) = slot.as_ref() else {
            bail!("user cache is unpopulated");
        };
        users
            .iter()
            .find(|u| u.uid == uid)
            .cloned()
            .ok_or_else(|| anyhow!("no cached user with uid {}", uid))
    }

    /// Check whether an association id exists in the cache. An
    /// unpopulated or empty cache validates any id unless `enforce` is
    /// set; with it, a missing id is an error rather than `Ok(false)`.
    pub fn validate_assoc_id(&self, id: u32, enforce: bool) -> Result<bool> {
        self.store
            .ensure_assocs(self.storage.as_ref(), self.identity.as_ref(), enforce)?;

        let slot = self.store.assocs.lock();
        let empty = slot.as_ref().is_none_or(|a| a.is_empty());
        if empty && !enforce {
            return Ok(true);
        }
        let found = slot
            .as_ref()
            .is_some_and(|a| a.iter().any(|c| c.id == Some(id)));
        if found {
            Ok(true)
        } else if enforce {
            Err(anyhow!("no association with id {}", id))
        } else {
            Ok(false)
        }
    }

    /// Admin level of `uid`, from the user cache only. Degrades to
    /// [`AdminLevel::NotSet`] when the cache is cold or the uid is
    /// unknown; never enforces population.
    pub fn admin_level(&self, uid: u32) -> AdminLevel {
        if self.store.ensure_users(self.storage.as_ref(), false).is_err() {
            return AdminLevel::NotSet;
        }
        let slot = self.store.users.lock();
        slot.as_ref()
            .and_then(|users| users.iter().find(|u| u.uid == uid))
            .map(|u| u.admin_level)
            .unwrap_or(AdminLevel::NotSet)
    }

    /// Whether `uid` holds coordinator rights over `acct`. Account
    /// comparison is case-sensitive; a cold cache or unknown uid answers
    /// `false`.
    pub fn is_coordinator(&self, uid: u32, acct: &str) -> bool {
        if self.store.ensure_users(self.storage.as_ref(), false).is_err() {
            return false;
        }
        let slot = self.store.users.lock();
        slot.as_ref()
            .and_then(|users| users.iter().find(|u| u.uid == uid))
            .is_some_and(|u| u.coord_accts.contains(acct))
    }

    /// Apply a batch of association mutations. A no-op when the
    /// collection was never populated; unmatched items are skipped
    /// silently.
    pub fn apply_assoc_updates(&self, batch: &AssocUpdates) -> BatchOutcome {
        update::apply_assoc_updates(&self.store, batch)
    }

    /// Apply a batch of user mutations. A no-op when the collection was
    /// never populated; unmet preconditions are recorded per item and the
    /// last one is what [`BatchOutcome::into_result`] reports.
    pub fn apply_user_updates(&self, batch: &UserUpdates) -> BatchOutcome {
        update::apply_user_updates(&self.store, batch)
    }

    /// Number of cached associations; `None` when never populated.
    pub fn assoc_count(&self) -> Option<usize> {
        self.store.assocs.lock().as_ref().map(Vec::len)
    }

    /// Number of cached users; `None` when never populated.
    pub fn user_count(&self) -> Option<usize> {
        self.store.users.lock().as_ref().map(Vec::len)
    }

    /// Copy of the association collection, in store order.
    pub fn assocs_snapshot(&self) -> Option<Vec<AssocRecord>> {
        self.store.assocs.lock().clone()
    }

    /// Copy of the user collection, in store order.
    pub fn users_snapshot(&self) -> Option<Vec<UserRecord>> {
        self.store.users.lock().clone()
    }
}
