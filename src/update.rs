//! # Update Merge Protocol
//!
//! Batched ADD/MODIFY/REMOVE mutations pushed from an upstream
//! change-notification mechanism. A batch carries one mutation kind and one
//! target type; application matches each item against the live collection
//! with the same cascade the query path uses, and reports a per-item
//! disposition. The caller's batch is never mutated; the cache clones what
//! it keeps.

use crate::model::{AdminLevel, AssocRecord, UserRecord};
use crate::query::{find_assoc, AssocQuery};
use crate::store::CacheStore;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mutation kind carried by a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    Add,
    Modify,
    Remove,
}

/// An ordered batch of association mutations of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssocUpdates {
    pub kind: UpdateKind,
    pub items: Vec<AssocRecord>,
}

/// An ordered batch of user mutations of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdates {
    pub kind: UpdateKind,
    pub items: Vec<UserRecord>,
}

/// What happened to one batch item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDisposition {
    /// Item inserted into the collection.
    Inserted,
    /// Existing record updated in place.
    Modified,
    /// Existing record erased.
    Removed,
    /// Item ignored without error (no match, duplicate add, or
    /// out-of-scope cluster).
    Skipped,
    /// Item failed its precondition; recorded as an error.
    Conflict,
}

/// Per-item dispositions plus the batch-level error signal.
///
/// Conflicts do not stop later items; `last_conflict` describes the last
/// item that failed its precondition, which is what the batch result
/// reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub dispositions: Vec<MergeDisposition>,
    pub last_conflict: Option<String>,
}

impl BatchOutcome {
    fn new(capacity: usize) -> Self {
        Self {
            dispositions: Vec::with_capacity(capacity),
            last_conflict: None,
        }
    }

    /// Whether every item met its precondition.
    pub fn is_ok(&self) -> bool {
        self.last_conflict.is_none()
    }

    /// Collapse to a success/failure signal, reporting the last conflict.
    pub fn into_result(self) -> Result<Vec<MergeDisposition>> {
        match self.last_conflict {
            Some(conflict) => bail!(conflict),
            None => Ok(self.dispositions),
        }
    }
}

/// Apply an association batch. A no-op when the collection was never
/// populated; mutations never force a population.
pub(crate) fn apply_assoc_updates(store: &CacheStore, batch: &AssocUpdates) -> BatchOutcome {
    let scope = store.scope();
    let scoped = scope.is_some();

    let mut slot = store.assocs.lock();
    let Some(assocs) = slot.as_mut() else {
        return BatchOutcome::new(0);
    };

    let mut outcome = BatchOutcome::new(batch.items.len());
    for item in &batch.items {
        // Under a fixed scope, items for other clusters are not ours.
        if let Some(scope_name) = scope.as_deref() {
            let ours = item
                .cluster
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(scope_name));
            if !ours {
                debug!(cluster = ?item.cluster, "skipping association update for another cluster");
                outcome.dispositions.push(MergeDisposition::Skipped);
                continue;
            }
        }

        let query = AssocQuery {
            id: item.id,
            user: item.user.clone(),
            uid: item.uid,
            acct: item.acct.clone(),
            cluster: item.cluster.clone(),
            partition: item.partition.clone(),
        };
        let found = find_assoc(assocs, &query, scoped);

        let disposition = match batch.kind {
            UpdateKind::Add => match found {
                // Existing record wins; the incoming item is dropped.
                Some(_) => MergeDisposition::Skipped,
                None => {
                    assocs.push(item.clone());
                    MergeDisposition::Inserted
                }
            },
            UpdateKind::Modify => match found {
                None => MergeDisposition::Skipped,
                Some(idx) => {
                    let rec = &mut assocs[idx];
                    debug!(id = ?rec.id, "updating association limits");
                    if item.fairshare.is_set() {
                        rec.fairshare = item.fairshare;
                    }
                    if item.max_jobs.is_set() {
                        rec.max_jobs = item.max_jobs;
                    }
                    if item.max_nodes_per_job.is_set() {
                        rec.max_nodes_per_job = item.max_nodes_per_job;
                    }
                    if item.max_wall_per_job.is_set() {
                        rec.max_wall_per_job = item.max_wall_per_job;
                    }
                    if item.max_cpu_secs_per_job.is_set() {
                        rec.max_cpu_secs_per_job = item.max_cpu_secs_per_job;
                    }
                    if item.parent_acct.is_some() {
                        rec.parent_acct = item.parent_acct.clone();
                    }
                    MergeDisposition::Modified
                }
            },
            UpdateKind::Remove => match found {
                None => MergeDisposition::Skipped,
                Some(idx) => {
                    assocs.remove(idx);
                    MergeDisposition::Removed
                }
            },
        };
        outcome.dispositions.push(disposition);
    }
    outcome
}

/// Apply a user batch. A no-op when the collection was never populated.
/// Items match existing records by case-insensitive name; unlike the
/// association path, unmet preconditions are recorded as conflicts.
pub(crate) fn apply_user_updates(store: &CacheStore, batch: &UserUpdates) -> BatchOutcome {
    let mut slot = store.users.lock();
    let Some(users) = slot.as_mut() else {
        return BatchOutcome::new(0);
    };

    let mut outcome = BatchOutcome::new(batch.items.len());
    for item in &batch.items {
        let found = users
            .iter()
            .position(|u| u.name.eq_ignore_ascii_case(&item.name));

        let disposition = match batch.kind {
            UpdateKind::Add => match found {
                Some(_) => {
                    outcome.last_conflict =
                        Some(format!("user {} is already cached", item.name));
                    MergeDisposition::Conflict
                }
                None => {
                    users.push(item.clone());
                    MergeDisposition::Inserted
                }
            },
            UpdateKind::Modify => match found {
                None => {
                    outcome.last_conflict =
                        Some(format!("no cached user {} to modify", item.name));
                    MergeDisposition::Conflict
                }
                Some(idx) => {
                    let rec = &mut users[idx];
                    if item.default_acct.is_some() {
                        rec.default_acct = item.default_acct.clone();
                    }
                    if item.qos.is_some() {
                        rec.qos = item.qos.clone();
                    }
                    if item.admin_level != AdminLevel::NotSet {
                        rec.admin_level = item.admin_level;
                    }
                    MergeDisposition::Modified
                }
            },
            UpdateKind::Remove => match found {
                None => {
                    outcome.last_conflict =
                        Some(format!("no cached user {} to remove", item.name));
                    MergeDisposition::Conflict
                }
                Some(idx) => {
                    users.remove(idx);
                    MergeDisposition::Removed
                }
            },
        };
        outcome.dispositions.push(disposition);
    }
    outcome
}
