//! Bounded, time-bucketed identity cache.
//!
//! Entries are keyed by `(subject, bucket)` where the bucket is the current
//! unix time divided by [`BUCKET_SECS`]. A new bucket starts a new key, so a
//! cached identity is reused for at most one bucket; old-bucket entries are
//! never read again and age out through LRU eviction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::policy::EvictionPolicy;
use tracing::debug;

use super::provider::ProviderError;
use crate::models::auth::Identity;

/// Width of one cache bucket in seconds.
pub const BUCKET_SECS: i64 = 300;

/// Default maximum number of cached identities.
pub const DEFAULT_CAPACITY: u64 = 100;

/// Index of a [`BUCKET_SECS`]-wide window of unix time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeBucket(i64);

impl TimeBucket {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(now.timestamp().div_euclid(BUCKET_SECS))
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn index(self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub subject: String,
    pub bucket: TimeBucket,
}

impl CacheKey {
    pub fn new(subject: impl Into<String>, bucket: TimeBucket) -> Self {
        Self {
            subject: subject.into(),
            bucket,
        }
    }
}

/// Identity cache shared across requests.
///
/// Concurrent misses on the same key are coalesced into a single provider
/// call. Failed lookups are not stored.
#[derive(Clone)]
pub struct IdentityCache {
    inner: Cache<CacheKey, Identity>,
}

impl IdentityCache {
    pub fn new(capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { inner }
    }

    /// Return the cached identity for `key`, or run `populate` and cache its
    /// result.
    pub async fn get_or_populate<F>(&self, key: CacheKey, populate: F) -> Result<Identity, ProviderError>
    where
        F: Future<Output = Result<Identity, ProviderError>>,
    {
        self.inner
            .try_get_with(key, populate)
            .await
            .map_err(|e: Arc<ProviderError>| (*e).clone())
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Identity> {
        self.inner.get(key).await
    }

    /// Drop a single entry.
    pub async fn invalidate(&self, key: &CacheKey) {
        debug!(subject = %key.subject, bucket = key.bucket.index(), "invalidating cached identity");
        self.inner.invalidate(key).await;
    }

    /// Approximate number of live entries. Call [`Self::sync`] first for an
    /// exact figure.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Flush pending maintenance (evictions, counters).
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::identity;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn buckets_are_five_minutes_wide() {
        // 1_700_000_100 is a multiple of 300: the first second of its bucket.
        let t0 = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
        let bucket = TimeBucket::at(t0);
        assert_eq!(bucket.index(), 1_700_000_100 / 300);
        assert_eq!(TimeBucket::at(t0 + chrono::Duration::seconds(299)), bucket);
        assert_eq!(TimeBucket::at(t0 + chrono::Duration::seconds(300)), bucket.next());
        assert_eq!(
            TimeBucket::at(t0 - chrono::Duration::seconds(1)).index(),
            bucket.index() - 1
        );
    }

    #[tokio::test]
    async fn concurrent_misses_load_once() {
        let cache = IdentityCache::new(10);
        let calls = AtomicUsize::new(0);
        let key = CacheKey::new("user_1", TimeBucket(1));
        let load = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Ok(identity("user_1"))
        };

        let (a, b) = tokio::join!(
            cache.get_or_populate(key.clone(), load()),
            cache.get_or_populate(key.clone(), load()),
        );
        assert_eq!(a.unwrap().id, "user_1");
        assert_eq!(b.unwrap().id, "user_1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn populates_once_per_key() {
        let cache = IdentityCache::new(10);
        let calls = AtomicUsize::new(0);
        let key = CacheKey::new("user_1", TimeBucket(1));
        for _ in 0..3 {
            let id = cache
                .get_or_populate(key.clone(), async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(identity("user_1"))
                })
                .await
                .unwrap();
            assert_eq!(id.id, "user_1");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn new_bucket_is_a_new_key() {
        let cache = IdentityCache::new(10);
        let calls = AtomicUsize::new(0);
        let bucket = TimeBucket(7);
        for b in [bucket, bucket.next()] {
            cache
                .get_or_populate(CacheKey::new("user_1", b), async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(identity("user_1"))
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = IdentityCache::new(10);
        let key = CacheKey::new("user_1", TimeBucket(1));
        let err = cache
            .get_or_populate(key.clone(), async {
                Err(ProviderError::Unavailable("down".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Unavailable("down".into()));
        assert!(cache.get(&key).await.is_none());

        let id = cache
            .get_or_populate(key.clone(), async { Ok(identity("user_1")) })
            .await
            .unwrap();
        assert_eq!(id.id, "user_1");
        assert!(cache.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache = IdentityCache::new(10);
        let key = CacheKey::new("user_1", TimeBucket(1));
        cache
            .get_or_populate(key.clone(), async { Ok(identity("user_1")) })
            .await
            .unwrap();
        cache.invalidate(&key).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn capacity_is_bounded() {
        let cache = IdentityCache::new(5);
        for i in 0..50 {
            let subject = format!("user_{i}");
            cache
                .get_or_populate(CacheKey::new(subject.clone(), TimeBucket(1)), async move {
                    Ok(identity(&subject))
                })
                .await
                .unwrap();
        }
        cache.sync().await;
        assert!(cache.entry_count() <= 5);
    }
}
