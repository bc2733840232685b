//! Cache configuration.

/// Construction-time settings for an [`crate::AssocCache`].
///
/// The cluster name decides the matching mode: when present the cache is
/// scoped to that cluster (association fetches are filtered and foreign
/// update items are skipped); when absent the cache is shared and cluster
/// equality becomes part of the match criteria.
#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    /// Cluster this cache serves, if pinned to one.
    pub cluster_name: Option<String>,
}

impl CacheConfig {
    /// A cache scoped to a single cluster.
    pub fn scoped(cluster_name: impl Into<String>) -> Self {
        Self {
            cluster_name: Some(cluster_name.into()),
        }
    }

    /// A cache shared across clusters.
    pub fn shared() -> Self {
        Self::default()
    }
}
