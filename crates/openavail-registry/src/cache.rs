//! Shared TTL cache for registry lookups, keyed by normalized DOI.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::RegistryRecord;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    record: Option<RegistryRecord>,
    fetched_at: Instant,
}

/// In-memory lookup cache. Negative results are cached too, so a DOI the
/// registry does not know is not re-fetched on every document.
pub struct RegistryCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl RegistryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn normalize_key(doi: &str) -> String {
        doi.trim().to_lowercase()
    }

    /// A cached value, or `None` when absent or expired. The outer Option
    /// is cache presence; the inner is the lookup result itself.
    pub fn get(&self, doi: &str) -> Option<Option<RegistryRecord>> {
        let key = Self::normalize_key(doi);
        let entries = self.entries.read().ok()?;
        let entry = entries.get(&key)?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.record.clone())
    }

    pub fn put(&self, doi: &str, record: Option<RegistryRecord>) {
        let key = Self::normalize_key(doi);
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                key,
                Entry {
                    record,
                    fetched_at: Instant::now(),
                },
            );
        }
    }

    #[cfg(test)]
    pub fn expire_all(&self) {
        if let Ok(mut entries) = self.entries.write() {
            for entry in entries.values_mut() {
                entry.fetched_at = Instant::now() - self.ttl - Duration::from_secs(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> RegistryRecord {
        RegistryRecord {
            title: title.into(),
            container_title: None,
            issued_year: Some(2021),
        }
    }

    #[test]
    fn keys_are_case_insensitive() {
        let cache = RegistryCache::default();
        cache.put("10.5281/Zenodo.123", Some(record("a title")));
        let hit = cache.get("10.5281/zenodo.123").expect("cache hit");
        assert_eq!(hit.unwrap().title, "a title");
    }

    #[test]
    fn negative_results_are_cached() {
        let cache = RegistryCache::default();
        cache.put("10.9999/unknown", None);
        assert_eq!(cache.get("10.9999/unknown"), Some(None));
    }

    #[test]
    fn expired_entries_miss() {
        let cache = RegistryCache::new(Duration::from_secs(60));
        cache.put("10.5281/zenodo.123", Some(record("t")));
        cache.expire_all();
        assert!(cache.get("10.5281/zenodo.123").is_none());
    }
}
