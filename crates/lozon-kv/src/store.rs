//! Shard store
//!
//! Owns one shard's in-memory map and its persistence backend. A single
//! RwLock guards the map: mutations take the write lock for the whole
//! insert-and-rewrite, so they are serialized against each other and against
//! reads; reads share the read lock and never touch the backing file.

use crate::error::KvError;
use crate::persistence::{LoadStats, Persistence};
use crate::types::{KvKey, KvValue, ShardId};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, error};

/// Outcome of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    Removed,
    NotFound,
}

/// Durable key-value store for a single shard
pub struct ShardStore {
    shard_id: ShardId,
    data: RwLock<HashMap<String, String>>,
    persistence: Box<dyn Persistence>,
}

impl ShardStore {
    /// Open a shard, loading its persisted state
    pub fn open(
        shard_id: ShardId,
        persistence: Box<dyn Persistence>,
    ) -> Result<(Self, LoadStats), KvError> {
        let loaded = persistence.load()?;
        debug!(
            "Shard {} loaded {} entries from {} ({} lines skipped)",
            shard_id,
            loaded.stats.entries_loaded,
            persistence.describe(),
            loaded.stats.lines_skipped
        );

        let store = Self {
            shard_id,
            data: RwLock::new(loaded.entries),
            persistence,
        };
        Ok((store, loaded.stats))
    }

    /// Get the shard id
    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    /// Where this shard persists, for logs
    pub fn location(&self) -> String {
        self.persistence.describe()
    }

    /// Insert or overwrite a value, then rewrite the backing state
    ///
    /// On a persistence failure the map is restored to its previous content
    /// and the error is returned.
    pub fn put(&self, key: &KvKey, value: KvValue) -> Result<(), KvError> {
        let mut guard = self.data.write();
        let previous = guard.insert(key.as_str().to_string(), value.into_string());

        if let Err(e) = self.persistence.rewrite(&guard) {
            error!("Shard {} failed to persist PUT {}: {}", self.shard_id, key, e);
            match previous {
                Some(old) => guard.insert(key.as_str().to_string(), old),
                None => guard.remove(key.as_str()),
            };
            return Err(e.into());
        }
        Ok(())
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Delete a key, rewriting the backing state only if it existed
    pub fn delete(&self, key: &str) -> Result<Deleted, KvError> {
        let mut guard = self.data.write();
        let Some(old) = guard.remove(key) else {
            return Ok(Deleted::NotFound);
        };

        if let Err(e) = self.persistence.rewrite(&guard) {
            error!("Shard {} failed to persist DEL {}: {}", self.shard_id, key, e);
            guard.insert(key.to_string(), old);
            return Err(e.into());
        }
        Ok(Deleted::Removed)
    }

    /// All pairs with `low <= key <= high`, sorted by key
    pub fn range(&self, low: &str, high: &str) -> Vec<(String, String)> {
        if low > high {
            return Vec::new();
        }

        let mut pairs: Vec<(String, String)> = {
            let guard = self.data.read();
            guard
                .iter()
                .filter(|(k, _)| low <= k.as_str() && k.as_str() <= high)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        pairs.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{LoadedState, MemoryPersistence, PersistenceError};
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn memory_store() -> ShardStore {
        ShardStore::open(0, Box::new(MemoryPersistence::new())).unwrap().0
    }

    fn key(s: &str) -> KvKey {
        KvKey::new(s).unwrap()
    }

    fn value(s: &str) -> KvValue {
        KvValue::new(s).unwrap()
    }

    /// Backend that counts rewrites and can be made to fail
    #[derive(Default)]
    struct FlakyPersistence {
        fail: Arc<AtomicBool>,
        rewrites: Arc<AtomicUsize>,
    }

    impl Persistence for FlakyPersistence {
        fn load(&self) -> crate::persistence::Result<LoadedState> {
            Ok(LoadedState::default())
        }

        fn rewrite(&self, _entries: &HashMap<String, String>) -> crate::persistence::Result<()> {
            self.rewrites.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                Err(PersistenceError::Io(io::Error::new(io::ErrorKind::Other, "disk full")))
            } else {
                Ok(())
            }
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn test_put_get() {
        let store = memory_store();
        store.put(&key("42"), value("tagId=7;relevance=0.9")).unwrap();

        assert_eq!(store.get("42"), Some("tagId=7;relevance=0.9".to_string()));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = memory_store();
        assert_eq!(store.get("999"), None);
    }

    #[test]
    fn test_put_overwrites_and_is_idempotent() {
        let store = memory_store();
        store.put(&key("k"), value("v1")).unwrap();
        store.put(&key("k"), value("v2")).unwrap();
        store.put(&key("k"), value("v2")).unwrap();

        assert_eq!(store.get("k"), Some("v2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete() {
        let store = memory_store();
        store.put(&key("1"), value("one")).unwrap();

        assert_eq!(store.delete("1").unwrap(), Deleted::Removed);
        assert_eq!(store.get("1"), None);
        assert_eq!(store.delete("1").unwrap(), Deleted::NotFound);
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_does_not_rewrite() {
        let rewrites = Arc::new(AtomicUsize::new(0));
        let persistence = FlakyPersistence {
            rewrites: rewrites.clone(),
            ..Default::default()
        };
        let (store, _) = ShardStore::open(0, Box::new(persistence)).unwrap();

        store.put(&key("a"), value("1")).unwrap();
        assert_eq!(rewrites.load(Ordering::SeqCst), 1);

        assert_eq!(store.delete("b").unwrap(), Deleted::NotFound);
        assert_eq!(rewrites.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_range_inclusive_and_sorted() {
        let store = memory_store();
        for k in ["5", "1", "3", "10", "6"] {
            store.put(&key(k), value(&format!("v{}", k))).unwrap();
        }

        let keys: Vec<String> = store.range("1", "5").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["1", "10", "3", "5"]);
    }

    #[test]
    fn test_range_low_greater_than_high_is_empty() {
        let store = memory_store();
        store.put(&key("3"), value("x")).unwrap();

        assert!(store.range("5", "1").is_empty());
    }

    #[test]
    fn test_failed_put_rolls_back() {
        let fail = Arc::new(AtomicBool::new(false));
        let persistence = FlakyPersistence {
            fail: fail.clone(),
            ..Default::default()
        };
        let (store, _) = ShardStore::open(3, Box::new(persistence)).unwrap();

        store.put(&key("k"), value("old")).unwrap();
        fail.store(true, Ordering::SeqCst);

        assert!(matches!(
            store.put(&key("k"), value("new")),
            Err(KvError::Persistence(_))
        ));
        assert!(store.put(&key("fresh"), value("x")).is_err());
        assert_eq!(store.get("k"), Some("old".to_string()));
        assert_eq!(store.get("fresh"), None);
    }

    #[test]
    fn test_failed_delete_rolls_back() {
        let fail = Arc::new(AtomicBool::new(false));
        let persistence = FlakyPersistence {
            fail: fail.clone(),
            ..Default::default()
        };
        let (store, _) = ShardStore::open(1, Box::new(persistence)).unwrap();

        store.put(&key("k"), value("v")).unwrap();
        fail.store(true, Ordering::SeqCst);

        assert!(store.delete("k").is_err());
        assert_eq!(store.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_concurrent_writers() {
        let store = Arc::new(memory_store());
        let mut handles = vec![];

        for t in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    let k = KvKey::new(format!("t{}_k{}", t, i)).unwrap();
                    store.put(&k, KvValue::new(format!("{}", i)).unwrap()).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 800);
        assert_eq!(store.get("t7_k99"), Some("99".to_string()));
    }
}
