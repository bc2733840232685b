//! Association and user resolution against a populated cache.

mod support;

use assoc_cache::{AssocCache, AssocQuery, AssocRecord, CacheConfig, MemStorage, NoIdentity};
use support::{sample_identity, sample_storage, scoped_cache};

#[test]
fn id_keyed_query_ignores_preset_fields() -> anyhow::Result<()> {
    let cache = scoped_cache();

    // Whatever else the caller pre-set, the id decides the match.
    let query = AssocQuery::by_id(4)
        .with_uid(500)
        .with_acct("phys")
        .with_partition("debug");
    let found = cache.resolve_assoc(&query, true)?.unwrap();

    assert_eq!(found.id, Some(4));
    assert_eq!(found.user.as_deref(), Some("grace"));
    assert_eq!(found.acct.as_deref(), Some("chem"));
    Ok(())
}

#[test]
fn exact_partition_beats_wildcard() -> anyhow::Result<()> {
    let cache = scoped_cache();

    let query = AssocQuery::by_uid(500)
        .with_user("ada")
        .with_acct("phys")
        .with_partition("debug");
    let found = cache.resolve_assoc(&query, true)?.unwrap();
    assert_eq!(found.id, Some(3));
    Ok(())
}

#[test]
fn unknown_partition_falls_back_to_wildcard() -> anyhow::Result<()> {
    let cache = scoped_cache();

    let query = AssocQuery::by_uid(500)
        .with_user("ada")
        .with_acct("phys")
        .with_partition("batch");
    let found = cache.resolve_assoc(&query, true)?.unwrap();

    // No partition-specific record for "batch": the wildcard one governs.
    assert_eq!(found.id, Some(2));
    assert_eq!(found.partition, None);
    Ok(())
}

#[test]
fn default_account_comes_from_the_user_cache() -> anyhow::Result<()> {
    let cache = scoped_cache();

    // Only the uid is known; account resolves to ada's default ("phys"),
    // cluster defaults to the process scope.
    let query = AssocQuery::by_uid(500);
    let found = cache.resolve_assoc(&query, true)?.unwrap();
    assert_eq!(found.id, Some(2));

    let merged = query.merged_with(&found);
    assert_eq!(merged.user.as_deref(), Some("ada"));
    assert_eq!(merged.acct.as_deref(), Some("phys"));
    assert_eq!(merged.cluster.as_deref(), Some("tundra"));
    Ok(())
}

#[test]
fn unknown_uid_fails_only_under_enforcement() -> anyhow::Result<()> {
    let cache = scoped_cache();

    let query = AssocQuery::by_uid(777);
    assert!(cache.resolve_assoc(&query, false)?.is_none());
    assert!(cache.resolve_assoc(&query, true).is_err());
    Ok(())
}

#[test]
fn merged_result_keeps_caller_set_fields() -> anyhow::Result<()> {
    let cache = scoped_cache();

    let query = AssocQuery::by_uid(500).with_user("ada").with_acct("PHYS");
    let found = cache.resolve_assoc(&query, true)?.unwrap();
    let merged = query.merged_with(&found);

    // The caller's spelling survives the merge; the gaps are filled.
    assert_eq!(merged.acct.as_deref(), Some("PHYS"));
    assert_eq!(merged.user.as_deref(), Some("ada"));
    assert_eq!(merged.id, Some(2));
    Ok(())
}

#[test]
fn shared_cache_uses_cluster_as_match_criteria() -> anyhow::Result<()> {
    let storage = MemStorage::new(
        vec![
            AssocRecord::new("ada", "phys", "tundra").with_id(1).with_uid(500),
            AssocRecord::new("ada", "phys", "mesa").with_id(2).with_uid(500),
        ],
        vec![],
    );
    let cache = AssocCache::new(CacheConfig::shared(), storage, NoIdentity);

    let query = AssocQuery::by_uid(500)
        .with_user("ada")
        .with_acct("phys")
        .with_cluster("mesa");
    let found = cache.resolve_assoc(&query, true)?.unwrap();
    assert_eq!(found.id, Some(2));

    // Without a cluster in the query, the first candidate governs and the
    // cluster comes from the match.
    let query = AssocQuery::by_uid(500).with_user("ada").with_acct("phys");
    let found = cache.resolve_assoc(&query, true)?.unwrap();
    assert_eq!(found.cluster.as_deref(), Some("tundra"));
    Ok(())
}

#[test]
fn account_level_query_matches_only_account_records() -> anyhow::Result<()> {
    let cache = scoped_cache();

    let query = AssocQuery {
        acct: Some("phys".to_string()),
        ..AssocQuery::default()
    };
    let found = cache.resolve_assoc(&query, true)?.unwrap();
    assert_eq!(found.id, Some(1));
    assert!(found.user.is_none());
    Ok(())
}

#[test]
fn population_resolves_uids_for_matching() -> anyhow::Result<()> {
    // The backing store never supplies uids; the identity seam does.
    let cache = AssocCache::new(
        CacheConfig::scoped("tundra"),
        sample_storage(),
        sample_identity(),
    );

    let found = cache.resolve_assoc(
        &AssocQuery::by_uid(501).with_user("grace").with_acct("chem"),
        true,
    )?;
    assert_eq!(found.unwrap().id, Some(4));
    Ok(())
}
