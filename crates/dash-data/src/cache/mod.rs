//! Loaded-table cache
//!
//! Entries are keyed by path plus serialized load options. There is no
//! eviction: entries live until they are replaced or the cache is cleared.

pub mod coalesce;

pub use coalesce::RequestCoalescer;

use ahash::AHashMap;
use dash_core::TabularResult;
use parking_lot::RwLock;
use serde::Serialize;

/// Snapshot of the cache contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    /// Cache keys, sorted
    pub keys: Vec<String>,
}

/// Cache of loaded tables
///
/// Callers get clones, so editing a returned table never alters the
/// cached entry.
#[derive(Default)]
pub struct DataCache {
    entries: RwLock<AHashMap<String, TabularResult>>,
}

impl DataCache {
    /// Create a new data cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of a cached table
    pub fn get(&self, key: &str) -> Option<TabularResult> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Store a table, replacing any previous entry
    pub fn put(&self, key: String, table: TabularResult) {
        self.entries.write().insert(key, table);
    }

    pub fn remove(&self, key: &str) -> Option<TabularResult> {
        self.entries.write().remove(key)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: entries.len(),
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_core::Value;

    fn table() -> TabularResult {
        let mut table = TabularResult::new(vec!["a".to_string()]).unwrap();
        table.push_row([("a".to_string(), Value::from(1))].into_iter().collect()).unwrap();
        table
    }

    #[test]
    fn test_put_get_clear() {
        let cache = DataCache::new();
        cache.put("b_{}".to_string(), table());
        cache.put("a_{}".to_string(), table());
        assert!(cache.contains("a_{}"));
        assert_eq!(
            cache.stats(),
            CacheStats {
                size: 2,
                keys: vec!["a_{}".to_string(), "b_{}".to_string()],
            }
        );
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a_{}").is_none());
    }

    #[test]
    fn test_returned_copies_are_independent() {
        let cache = DataCache::new();
        cache.put("k".to_string(), table());
        let mut copy = cache.get("k").unwrap();
        copy.set(0, "a", Value::from("changed")).unwrap();
        copy.add_column("extra", Value::Null);
        let fresh = cache.get("k").unwrap();
        assert_eq!(fresh.rows()[0]["a"], Value::Number(1.0));
        assert_eq!(fresh.column_count(), 1);
    }
}
