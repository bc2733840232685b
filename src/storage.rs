//! # Storage Seams
//!
//! Boundaries to the external collaborators the cache depends on: the
//! accounting backing store that serves full record snapshots, and the OS
//! identity database that maps user names to numeric ids. Transport,
//! schema, and retry behavior all live behind these traits; the cache only
//! sees freshly allocated snapshots.

use crate::model::{AssocRecord, UserRecord};
use anyhow::Result;
use std::collections::HashMap;

/// Backing store serving full snapshots of accounting records.
///
/// `Ok(None)` means the store yielded nothing; whether that is an error is
/// the cache's per-call enforcement decision, not the store's.
pub trait AcctStorage: Send + Sync {
    /// Fetch all associations, filtered to a single cluster when given.
    fn fetch_assocs(&self, cluster: Option<&str>) -> Result<Option<Vec<AssocRecord>>>;

    /// Fetch all users, unfiltered.
    fn fetch_users(&self) -> Result<Option<Vec<UserRecord>>>;
}

/// OS identity lookup. Absence is not an error.
pub trait IdentityResolver: Send + Sync {
    /// Numeric id for a user name, if the OS knows one.
    fn uid_for(&self, user: &str) -> Option<u32>;
}

/// In-memory backing store, used by tests and single-process embedders.
#[derive(Debug, Clone, Default)]
pub struct MemStorage {
    assocs: Option<Vec<AssocRecord>>,
    users: Option<Vec<UserRecord>>,
}

impl MemStorage {
    /// A store that yields nothing for either collection.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// A store serving the given snapshots.
    pub fn new(assocs: Vec<AssocRecord>, users: Vec<UserRecord>) -> Self {
        Self {
            assocs: Some(assocs),
            users: Some(users),
        }
    }

    pub fn with_assocs(mut self, assocs: Vec<AssocRecord>) -> Self {
        self.assocs = Some(assocs);
        self
    }

    pub fn with_users(mut self, users: Vec<UserRecord>) -> Self {
        self.users = Some(users);
        self
    }
}

impl AcctStorage for MemStorage {
    fn fetch_assocs(&self, cluster: Option<&str>) -> Result<Option<Vec<AssocRecord>>> {
        let Some(assocs) = &self.assocs else {
            return Ok(None);
        };
        let snapshot = match cluster {
            Some(name) => assocs
                .iter()
                .filter(|a| a.cluster.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(name)))
                .cloned()
                .collect(),
            None => assocs.clone(),
        };
        Ok(Some(snapshot))
    }

    fn fetch_users(&self) -> Result<Option<Vec<UserRecord>>> {
        Ok(self.users.clone())
    }
}

/// Identity resolver backed by a fixed name→uid table.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    table: HashMap<String, u32>,
}

impl StaticIdentity {
    pub fn new(table: HashMap<String, u32>) -> Self {
        Self { table }
    }

    pub fn with_user(mut self, name: impl Into<String>, uid: u32) -> Self {
        self.table.insert(name.into(), uid);
        self
    }
}

impl IdentityResolver for StaticIdentity {
    fn uid_for(&self, user: &str) -> Option<u32> {
        self.table.get(user).copied()
    }
}

/// Identity resolver that never resolves; records keep whatever uid the
/// backing store supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIdentity;

impl IdentityResolver for NoIdentity {
    fn uid_for(&self, _user: &str) -> Option<u32> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_storage_filters_by_cluster() {
        let storage = MemStorage::default().with_assocs(vec![
            AssocRecord::new("ada", "phys", "tundra").with_id(1),
            AssocRecord::new("ada", "phys", "mesa").with_id(2),
        ]);

        let snapshot = storage.fetch_assocs(Some("tundra")).unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, Some(1));

        let unfiltered = storage.fetch_assocs(None).unwrap().unwrap();
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn unavailable_storage_yields_nothing() {
        let storage = MemStorage::unavailable();
        assert!(storage.fetch_assocs(None).unwrap().is_none());
        assert!(storage.fetch_users().unwrap().is_none());
    }

    #[test]
    fn static_identity_resolves_known_names_only() {
        let identity = StaticIdentity::default().with_user("ada", 500);
        assert_eq!(identity.uid_for("ada"), Some(500));
        assert_eq!(identity.uid_for("grace"), None);
    }
}
