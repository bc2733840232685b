//! # Query Module
//!
//! Association queries and the cascading partial-match resolution that
//! decides which cached record governs a request. A query carries any
//! subset of the identity fields; resolution is id-first, then a
//! uid/account/cluster/partition cascade with partition-wildcard fallback.

use crate::model::AssocRecord;
use tracing::debug;

/// A partially specified association lookup.
///
/// Unset fields are wildcards. `id`, when present, short-circuits every
/// other criterion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssocQuery {
    pub id: Option<u32>,
    pub user: Option<String>,
    pub uid: Option<u32>,
    pub acct: Option<String>,
    pub cluster: Option<String>,
    pub partition: Option<String>,
}

impl AssocQuery {
    /// Query by association id alone.
    pub fn by_id(id: u32) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Query by uid alone; account and cluster are resolved from the
    /// user cache and the process cluster scope.
    pub fn by_uid(uid: u32) -> Self {
        Self {
            uid: Some(uid),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }

    pub fn with_acct(mut self, acct: impl Into<String>) -> Self {
        self.acct = Some(acct.into());
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn with_partition(mut self, partition: impl Into<String>) -> Self {
        self.partition = Some(partition.into());
        self
    }

    /// Merge a matched record into this query, filling only the gaps.
    ///
    /// Fields the caller already set are never overwritten; everything the
    /// caller left unset (including the limits) comes from the record.
    pub fn merged_with(&self, record: &AssocRecord) -> AssocRecord {
        let mut merged = record.clone();
        if self.user.is_some() {
            merged.user = self.user.clone();
        }
        if self.uid.is_some() {
            merged.uid = self.uid;
        }
        if self.acct.is_some() {
            merged.acct = self.acct.clone();
        }
        if self.cluster.is_some() {
            merged.cluster = self.cluster.clone();
        }
        if self.partition.is_some() {
            merged.partition = self.partition.clone();
        }
        merged
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Find the candidate matching `query`, scanning in store order.
///
/// `scoped` tells whether the cache is pinned to one cluster; cluster
/// equality is only part of the criteria when it is not. Returns the index
/// of the exact match, or of the last partition-wildcard fallback when no
/// exact-partition candidate exists.
pub(crate) fn find_assoc(
    candidates: &[AssocRecord],
    query: &AssocQuery,
    scoped: bool,
) -> Option<usize> {
    if let Some(id) = query.id {
        return candidates.iter().position(|c| c.id == Some(id));
    }

    let mut fallback = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        if query.user.is_none() && candidate.user.is_some() {
            debug!("looking for an account-level association, skipping user record");
            continue;
        }
        if query.uid != candidate.uid {
            debug!("not the right user");
            continue;
        }
        if let (Some(c_acct), Some(q_acct)) = (&candidate.acct, &query.acct) {
            if !eq_ignore_case(c_acct, q_acct) {
                debug!("not the right account");
                continue;
            }
        }
        // Cluster equality only matters when the cache is shared.
        if !scoped {
            if let (Some(c_cluster), Some(q_cluster)) = (&candidate.cluster, &query.cluster) {
                if !eq_ignore_case(c_cluster, q_cluster) {
                    debug!("not the right cluster");
                    continue;
                }
            }
        }
        if let Some(q_partition) = &query.partition {
            let exact = candidate
                .partition
                .as_deref()
                .is_some_and(|p| eq_ignore_case(p, q_partition));
            if !exact {
                debug!("found association for no partition");
                fallback = Some(idx);
                continue;
            }
        }
        debug!("found correct association");
        return Some(idx);
    }

    fallback
}
