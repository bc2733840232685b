//! # Data Model
//!
//! Core record types for the association/user cache: associations binding a
//! user (or a whole account) to an account, cluster, and optional partition,
//! and users carrying identity, default account, and delegated-admin rights.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A per-attribute resource limit.
///
/// Every limit field is one of three distinct states: inherit from the
/// parent association (unset), explicitly unlimited, or a concrete cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Limit {
    /// Unset; the effective value comes from the parent association.
    #[default]
    Inherit,
    /// Explicitly unlimited.
    Unlimited,
    /// A concrete cap.
    Value(u32),
}

impl Limit {
    /// Whether this limit carries an explicit value (unlimited counts).
    pub fn is_set(&self) -> bool {
        !matches!(self, Limit::Inherit)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Inherit => write!(f, "inherit"),
            Limit::Unlimited => write!(f, "unlimited"),
            Limit::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Administrative privilege level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdminLevel {
    /// Unknown; the cache could not answer.
    #[default]
    NotSet,
    /// No administrative rights.
    None,
    /// Operator rights (may manage jobs, not accounting).
    Operator,
    /// Full administrative rights.
    Admin,
}

impl fmt::Display for AdminLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminLevel::NotSet => write!(f, "notset"),
            AdminLevel::None => write!(f, "none"),
            AdminLevel::Operator => write!(f, "operator"),
            AdminLevel::Admin => write!(f, "admin"),
        }
    }
}

/// An association of a user (or an account as a whole) to an account,
/// cluster, and optional partition, carrying resource limits.
///
/// `id` is assigned by the backing store and, when present, uniquely
/// identifies one record. `user == None` marks an account-level
/// association. Duplicate-looking records may coexist (partition-specific
/// next to partition-wildcard) and are disambiguated by the match cascade.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssocRecord {
    pub id: Option<u32>,
    pub user: Option<String>,
    /// Resolved OS numeric id; best-effort, filled during population.
    pub uid: Option<u32>,
    pub acct: Option<String>,
    pub cluster: Option<String>,
    pub partition: Option<String>,
    pub parent_acct: Option<String>,
    pub fairshare: Limit,
    pub max_jobs: Limit,
    pub max_nodes_per_job: Limit,
    pub max_wall_per_job: Limit,
    pub max_cpu_secs_per_job: Limit,
}

impl AssocRecord {
    /// Create an association for `user` under `acct` on `cluster`.
    pub fn new(
        user: impl Into<String>,
        acct: impl Into<String>,
        cluster: impl Into<String>,
    ) -> Self {
        Self {
            user: Some(user.into()),
            acct: Some(acct.into()),
            cluster: Some(cluster.into()),
            ..Self::default()
        }
    }

    /// Create an account-level association (no user) on `cluster`.
    pub fn account_level(acct: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            acct: Some(acct.into()),
            cluster: Some(cluster.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }
}

impl fmt::Display for AssocRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "assoc(id={:?}, user={:?}, acct={:?}, cluster={:?}, partition={:?})",
            self.id, self.user, self.acct, self.cluster, self.partition
        )
    }
}

/// A user known to the accounting system.
///
/// `uid` is the authoritative lookup key. `coord_accts` is the set of
/// accounts over which this user holds coordinator (delegated-admin)
/// rights; membership checks are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub uid: u32,
    pub default_acct: Option<String>,
    /// Named quality-of-service class, when assigned.
    pub qos: Option<String>,
    pub admin_level: AdminLevel,
    pub coord_accts: HashSet<String>,
}

impl UserRecord {
    /// Create a user with the given name and uid.
    pub fn new(name: impl Into<String>, uid: u32) -> Self {
        Self {
            name: name.into(),
            uid,
            ..Self::default()
        }
    }

    pub fn with_default_acct(mut self, acct: impl Into<String>) -> Self {
        self.default_acct = Some(acct.into());
        self
    }

    pub fn with_admin_level(mut self, level: AdminLevel) -> Self {
        self.admin_level = level;
        self
    }

    pub fn with_coord_acct(mut self, acct: impl Into<String>) -> Self {
        self.coord_accts.insert(acct.into());
        self
    }
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user({}, uid={})", self.name, self.uid)
    }
}
