//! Record of URLs already scheduled for crawling.
//!
//! Keys are content addressed (see [`crate::util::visited_key`]). Membership
//! is time windowed: a key older than the retention window counts as unseen
//! and is dropped, and each backend also caps the number of keys it keeps.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use redis::AsyncCommands;
use tracing::{debug, instrument};

use crate::config::{VisitedBackend, VisitedSettings};
use crate::error::StoreError;
use crate::TARGET_STORAGE;

pub const REDIS_VISITED_KEY: &str = "omni:crawler:visited_urls";

#[async_trait]
pub trait VisitedSet: Send + Sync {
    async fn contains(&self, key: &str) -> Result<bool, StoreError>;
    async fn insert(&self, key: &str) -> Result<(), StoreError>;
}

/// Builds the backend selected in configuration.
pub fn from_settings(
    settings: &VisitedSettings,
    redis_url: &str,
) -> Result<Box<dyn VisitedSet>, StoreError> {
    let retention = settings.retention();
    Ok(match settings.backend {
        VisitedBackend::Memory => Box::new(MemoryVisitedSet::new(retention, settings.max_entries)),
        VisitedBackend::Redis => Box::new(RedisVisitedSet::new(
            redis_url,
            retention,
            settings.max_entries,
        )?),
    })
}

/// Oldest insertion time still inside `retention`, saturating at the
/// earliest representable instant.
fn cutoff_from(now: DateTime<Utc>, retention: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Size the memory set is trimmed to once it exceeds its cap.
fn low_water_mark(max_entries: usize) -> usize {
    (max_entries - max_entries / 10).max(1)
}

/// Process-local visited set. Only suitable when a single orchestrator runs.
pub struct MemoryVisitedSet {
    entries: DashMap<String, DateTime<Utc>>,
    retention: Duration,
    max_entries: usize,
}

impl MemoryVisitedSet {
    pub fn new(retention: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            retention,
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert_at(&self, key: &str, at: DateTime<Utc>) {
        self.entries.insert(key.to_string(), at);
        if self.entries.len() > self.max_entries {
            self.evict(at);
        }
    }

    /// Drops expired keys, then the oldest keys until the set is back at the
    /// low-water mark, so the full sort runs once per batch of inserts.
    fn evict(&self, now: DateTime<Utc>) {
        let cutoff = cutoff_from(now, self.retention);
        self.entries.retain(|_, seen| *seen >= cutoff);
        if self.entries.len() <= self.max_entries {
            return;
        }

        let excess = self.entries.len().saturating_sub(low_water_mark(self.max_entries));
        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        by_age.sort_by_key(|(_, seen)| *seen);
        for (key, _) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
        }
        debug!(target: TARGET_STORAGE, "Evicted {} visited keys over the cap", excess);
    }

    fn contains_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        let seen = self.entries.get(key).map(|e| *e.value());
        match seen {
            Some(seen) if seen >= cutoff_from(now, self.retention) => true,
            Some(_) => {
                self.entries.remove(key);
                false
            }
            None => false,
        }
    }
}

#[async_trait]
impl VisitedSet for MemoryVisitedSet {
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.contains_at(key, Utc::now()))
    }

    async fn insert(&self, key: &str) -> Result<(), StoreError> {
        self.insert_at(key, Utc::now());
        Ok(())
    }
}

/// Visited set shared between processes through a Redis sorted set scored by
/// insertion time.
pub struct RedisVisitedSet {
    client: redis::Client,
    key: String,
    retention: Duration,
    max_entries: usize,
}

impl RedisVisitedSet {
    pub fn new(redis_url: &str, retention: Duration, max_entries: usize) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            key: REDIS_VISITED_KEY.to_string(),
            retention,
            max_entries: max_entries.max(1),
        })
    }

    fn cutoff(&self) -> f64 {
        cutoff_from(Utc::now(), self.retention).timestamp() as f64
    }
}

#[async_trait]
impl VisitedSet for RedisVisitedSet {
    #[instrument(target = "storage", level = "debug", skip(self))]
    async fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let score: Option<f64> = con.zscore(&self.key, key).await?;
        Ok(matches!(score, Some(seen) if seen >= self.cutoff()))
    }

    #[instrument(target = "storage", level = "debug", skip(self))]
    async fn insert(&self, key: &str) -> Result<(), StoreError> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let now = Utc::now().timestamp() as f64;
        let _: () = con.zadd(&self.key, key, now).await?;
        let _: () = con.zrembyscore(&self.key, "-inf", format!("({}", self.cutoff())).await?;
        // oldest members go first once the cap is exceeded
        let _: () = con
            .zremrangebyrank(&self.key, 0, -(self.max_entries as isize) - 1)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_contains() {
        let set = MemoryVisitedSet::new(Duration::hours(1), 10);
        assert!(!set.contains("a").await.unwrap());
        set.insert("a").await.unwrap();
        assert!(set.contains("a").await.unwrap());
        assert!(!set.contains("b").await.unwrap());
    }

    #[test]
    fn expired_keys_count_as_unseen() {
        let set = MemoryVisitedSet::new(Duration::hours(1), 10);
        let now = Utc::now();
        set.insert_at("old", now - Duration::hours(2));
        set.insert_at("fresh", now - Duration::minutes(5));
        assert!(!set.contains_at("old", now));
        assert!(set.contains_at("fresh", now));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn oldest_keys_are_evicted_over_the_cap() {
        let set = MemoryVisitedSet::new(Duration::hours(24), 3);
        let now = Utc::now();
        for (i, key) in ["k1", "k2", "k3", "k4"].iter().enumerate() {
            set.insert_at(key, now - Duration::minutes(10 - i as i64));
        }
        assert_eq!(set.len(), 3);
        assert!(!set.contains_at("k1", now));
        assert!(set.contains_at("k4", now));
    }

    #[test]
    fn eviction_trims_to_the_low_water_mark() {
        let set = MemoryVisitedSet::new(Duration::hours(24), 100);
        let now = Utc::now();
        for i in 0..=100 {
            set.insert_at(&format!("key-{}", i), now - Duration::seconds(1000 - i));
        }
        assert_eq!(set.len(), 90);
        assert!(!set.contains_at("key-10", now));
        assert!(set.contains_at("key-11", now));

        // room below the cap again, so the next inserts do not evict
        for i in 101..=110 {
            set.insert_at(&format!("key-{}", i), now - Duration::seconds(1000 - i));
        }
        assert_eq!(set.len(), 100);
    }

    #[test]
    fn huge_retention_never_overflows() {
        let set = MemoryVisitedSet::new(Duration::MAX, 10);
        let now = Utc::now();
        set.insert_at("a", now);
        assert!(set.contains_at("a", now));
        assert!(!set.contains_at("b", now));
    }

    #[tokio::test]
    async fn concurrent_inserts_are_all_visible() {
        let set = std::sync::Arc::new(MemoryVisitedSet::new(Duration::hours(1), 1000));
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let set = set.clone();
                tokio::spawn(async move { set.insert(&format!("key-{}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        for i in 0..50 {
            assert!(set.contains(&format!("key-{}", i)).await.unwrap());
        }
    }
}
