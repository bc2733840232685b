use assoc_cache::{
    AdminLevel, AssocCache, AssocRecord, CacheConfig, MemStorage, StaticIdentity, UserRecord,
};

/// Route trace output through the test harness capture so match-rejection
/// traces show up on failure. Safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Backing store for a small two-account cluster: one account-level
/// association, a partition-wildcard and a partition-specific association
/// for ada, and one association for grace.
#[allow(dead_code)]
pub fn sample_storage() -> MemStorage {
    init_tracing();
    MemStorage::new(sample_assocs(), sample_users())
}

#[allow(dead_code)]
pub fn sample_assocs() -> Vec<AssocRecord> {
    vec![
        AssocRecord::account_level("phys", "tundra").with_id(1),
        AssocRecord::new("ada", "phys", "tundra").with_id(2),
        AssocRecord::new("ada", "phys", "tundra").with_id(3).with_partition("debug"),
        AssocRecord::new("grace", "chem", "tundra").with_id(4),
    ]
}

#[allow(dead_code)]
pub fn sample_users() -> Vec<UserRecord> {
    vec![
        UserRecord::new("ada", 500)
            .with_default_acct("phys")
            .with_admin_level(AdminLevel::None)
            .with_coord_acct("phys"),
        UserRecord::new("grace", 501)
            .with_default_acct("chem")
            .with_admin_level(AdminLevel::Admin),
    ]
}

#[allow(dead_code)]
pub fn sample_identity() -> StaticIdentity {
    StaticIdentity::default()
        .with_user("ada", 500)
        .with_user("grace", 501)
}

/// A cache scoped to the sample cluster, not yet populated.
#[allow(dead_code)]
pub fn scoped_cache() -> AssocCache {
    AssocCache::new(CacheConfig::scoped("tundra"), sample_storage(), sample_identity())
}
