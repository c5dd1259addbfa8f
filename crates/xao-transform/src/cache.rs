//! Cache collaborator for rendered output.
//!
//! The wrappers never decide *what* to cache; they forward a [`CacheParams`]
//! bag to whatever [`ResultCache`] the application installed and use a hit
//! instead of doing the work. [`MemoryCache`] keeps entries in process.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::debug;

/// Where and for how long a result may be cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheParams {
    pub key: String,
    /// Lifetime measured from when the entry is stored
    pub ttl: Option<Duration>,
    /// Absolute expiry
    pub expires: Option<DateTime<Utc>>,
}

impl CacheParams {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: None,
            expires: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// The earlier of the two expiry settings, relative to `now`.
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let by_ttl = self.ttl.map(|ttl| now + ttl);
        match (by_ttl, self.expires) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Storage for rendered output.
pub trait ResultCache: Send + Sync {
    /// A live entry for `params.key`.
    fn get(&self, params: &CacheParams) -> Option<String>;

    /// Store `value` under `params.key`.
    fn put(&self, params: &CacheParams, value: &str);

    /// Drop the entry for `key`, if any.
    fn invalidate(&self, key: &str);
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process cache. Expired entries are dropped when next looked up.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ResultCache for MemoryCache {
    fn get(&self, params: &CacheParams) -> Option<String> {
        let mut entries = self.entries.lock();
        let entry = entries.get(&params.key)?;
        if entry.is_live(Utc::now()) {
            debug!(key = %params.key, "cache hit");
            return Some(entry.value.clone());
        }
        debug!(key = %params.key, "cache entry expired");
        entries.remove(&params.key);
        None
    }

    fn put(&self, params: &CacheParams, value: &str) {
        let entry = Entry {
            value: value.to_string(),
            expires_at: params.expiry(Utc::now()),
        };
        self.entries.lock().insert(params.key.clone(), entry);
    }

    fn invalidate(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stored_value_is_returned() {
        let cache = MemoryCache::new();
        let params = CacheParams::new("home").with_ttl(Duration::hours(1));
        assert_eq!(cache.get(&params), None);
        cache.put(&params, "<html/>");
        assert_eq!(cache.get(&params).as_deref(), Some("<html/>"));
    }

    #[test]
    fn past_expiry_is_a_miss() {
        let cache = MemoryCache::new();
        let params = CacheParams::new("old").with_expires(Utc::now() - Duration::seconds(5));
        cache.put(&params, "stale");
        assert_eq!(cache.get(&params), None);
        assert!(cache.is_empty(), "expired entry is dropped on lookup");
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = MemoryCache::new();
        let params = CacheParams::new("brief").with_ttl(Duration::zero());
        cache.put(&params, "gone");
        assert_eq!(cache.get(&params), None);
    }

    #[test]
    fn earlier_expiry_wins() {
        let now = Utc::now();
        let params = CacheParams::new("k")
            .with_ttl(Duration::minutes(10))
            .with_expires(now + Duration::minutes(1));
        assert_eq!(params.expiry(now), Some(now + Duration::minutes(1)));
        assert_eq!(CacheParams::new("k").expiry(now), None);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = MemoryCache::new();
        let params = CacheParams::new("page");
        cache.put(&params, "body");
        assert_eq!(cache.len(), 1);
        cache.invalidate("page");
        assert_eq!(cache.get(&params), None);
    }
}
