//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache contract against an in-memory session.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::{ttl, BlockingCache, CassandraCache, CassandraCacheOptions, EntryOptions};
use crate::error::CacheError;
use crate::session::MemorySession;

type TestCache = BlockingCache<CassandraCache<MemorySession>>;

fn create_cache() -> (TestCache, Arc<MemorySession>) {
    let session = Arc::new(MemorySession::new());
    let cache = BlockingCache::connect(CassandraCacheOptions::new(session.clone())).unwrap();
    (cache, session)
}

// == Strategies ==
/// Generates valid cache keys (non-empty)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:-]{1,64}"
}

/// Generates arbitrary payloads, including empty ones
fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..512)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Vec<u8> },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    let key = "k[0-4]";
    prop_oneof![
        (key, value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.prop_map(|key| CacheOp::Remove { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // A key that was never written reads as absent.
    #[test]
    fn prop_unwritten_key_is_absent(key in valid_key_strategy()) {
        let (cache, _) = create_cache();
        prop_assert_eq!(cache.get(&key).unwrap(), None);
    }

    // Storing then reading returns the exact bytes.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in value_strategy()) {
        let (cache, _) = create_cache();

        cache.set(&key, &value, &EntryOptions::default()).unwrap();

        prop_assert_eq!(cache.get(&key).unwrap(), Some(value));
    }

    // Repeating an identical set leaves one row holding the value.
    #[test]
    fn prop_repeated_set_is_idempotent(
        key in valid_key_strategy(),
        value in value_strategy(),
        repeats in 1usize..5
    ) {
        let (cache, session) = create_cache();

        for _ in 0..repeats {
            cache.set(&key, &value, &EntryOptions::default()).unwrap();
        }

        prop_assert_eq!(cache.get(&key).unwrap(), Some(value));
        prop_assert_eq!(cache.block_on(session.row_count()), 1);
    }

    // After a remove, the key reads as absent.
    #[test]
    fn prop_remove_removes_entry(key in valid_key_strategy(), value in value_strategy()) {
        let (cache, _) = create_cache();
        cache.set(&key, &value, &EntryOptions::default()).unwrap();

        cache.remove(&key).unwrap();

        prop_assert_eq!(cache.get(&key).unwrap(), None);
    }

    // Removing a key that was never set succeeds.
    #[test]
    fn prop_remove_unwritten_key_ok(key in valid_key_strategy()) {
        let (cache, _) = create_cache();
        prop_assert!(cache.remove(&key).is_ok());
    }

    // Overwriting returns the latest value.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy()
    ) {
        let (cache, _) = create_cache();

        cache.set(&key, &value1, &EntryOptions::default()).unwrap();
        cache.set(&key, &value2, &EntryOptions::default()).unwrap();

        prop_assert_eq!(cache.get(&key).unwrap(), Some(value2));
    }

    // An absolute expiration that is not in the future fails and writes nothing.
    #[test]
    fn prop_past_expiration_rejected(
        key in valid_key_strategy(),
        value in value_strategy(),
        seconds_ago in 0i64..86_400
    ) {
        let (cache, session) = create_cache();
        let at = Utc::now() - chrono::Duration::seconds(seconds_ago);
        let options = EntryOptions::new().with_absolute_expiration(at);

        let result = cache.set(&key, &value, &options);

        let is_out_of_range = matches!(result, Err(CacheError::OutOfRange { .. }));
        prop_assert!(is_out_of_range);
        prop_assert_eq!(cache.get(&key).unwrap(), None);
        prop_assert_eq!(cache.block_on(session.stats()).writes, 0);
    }

    // Refresh never changes the stored value or its TTL.
    #[test]
    fn prop_refresh_preserves_entry(
        key in valid_key_strategy(),
        value in value_strategy(),
        lifetime in 60u64..86_400
    ) {
        let (cache, session) = create_cache();
        let options = EntryOptions::new().with_relative_expiration(Duration::from_secs(lifetime));
        cache.set(&key, &value, &options).unwrap();
        let ttl_before = cache.block_on(session.ttl_remaining(&key));

        cache.refresh(&key).unwrap();

        let ttl_after = cache.block_on(session.ttl_remaining(&key));
        prop_assert_eq!(cache.get(&key).unwrap(), Some(value));
        // Whole-second TTL may tick over between the two reads
        let before = ttl_before.unwrap();
        let after = ttl_after.unwrap();
        prop_assert!(after <= before && before - after <= 1);
    }

    // The latest operation on each key decides what a read returns.
    #[test]
    fn prop_last_write_wins(ops in prop::collection::vec(cache_op_strategy(), 1..40)) {
        let (cache, _) = create_cache();
        let mut expected = std::collections::HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(&key, &value, &EntryOptions::default()).unwrap();
                    expected.insert(key, value);
                }
                CacheOp::Remove { key } => {
                    cache.remove(&key).unwrap();
                    expected.remove(&key);
                }
            }
        }

        for i in 0..5 {
            let key = format!("k{}", i);
            prop_assert_eq!(cache.get(&key).unwrap(), expected.get(&key).cloned());
        }
    }
}

// TTL arithmetic over arbitrary instants
proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // A relative expiration of N seconds always yields a TTL of N.
    #[test]
    fn prop_relative_ttl_matches_lifetime(
        millis in 0i64..4_000_000_000_000,
        lifetime in 1u64..(i32::MAX as u64)
    ) {
        let creation: DateTime<Utc> = DateTime::from_timestamp_millis(millis).unwrap();
        let options = EntryOptions::new().with_relative_expiration(Duration::from_secs(lifetime));

        let expiration = ttl::resolve_expiration(creation, &options).unwrap();

        prop_assert_eq!(ttl::ttl_seconds(creation, expiration).unwrap() as u64, lifetime);
    }

    // A future absolute expiration yields the truncated number of seconds until it.
    #[test]
    fn prop_absolute_ttl_is_truncated_difference(
        millis in 0i64..4_000_000_000_000,
        ahead_ms in 1i64..1_000_000_000
    ) {
        let creation: DateTime<Utc> = DateTime::from_timestamp_millis(millis).unwrap();
        let at = creation + chrono::Duration::milliseconds(ahead_ms);
        let options = EntryOptions::new().with_absolute_expiration(at);

        let expiration = ttl::resolve_expiration(creation, &options).unwrap();
        let seconds = ttl::ttl_seconds(creation, expiration).unwrap();

        prop_assert!(seconds >= 0);
        prop_assert_eq!(i64::from(seconds), ahead_ms / 1000);
    }
}
