//! Integration tests for shard persistence

use lozon_kv::config::ClusterConfig;
use lozon_kv::persistence::RewriteFile;
use lozon_kv::store::{Deleted, ShardStore};
use lozon_kv::types::{KvKey, KvValue};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to open a file-backed shard
fn open_shard(path: &Path) -> ShardStore {
    let backend = RewriteFile::new(path).unwrap();
    let (store, _stats) = ShardStore::open(0, Box::new(backend)).unwrap();
    store
}

fn put(store: &ShardStore, key: &str, value: &str) {
    store
        .put(&KvKey::new(key).unwrap(), KvValue::new(value).unwrap())
        .unwrap();
}

/// Test basic write -> restart -> read cycle
#[test]
fn test_restart_preserves_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bucket_0.txt");

    {
        let store = open_shard(&path);
        put(&store, "42", "tagId=7;relevance=0.9");
        put(&store, "7", "tagId=1;relevance=0.1");
    }

    {
        let store = open_shard(&path);
        assert_eq!(store.get("42"), Some("tagId=7;relevance=0.9".to_string()));
        assert_eq!(store.get("7"), Some("tagId=1;relevance=0.1".to_string()));
        assert_eq!(store.len(), 2);
    }
}

/// Deleted keys must not come back after a restart
#[test]
fn test_restart_does_not_resurrect_deleted_keys() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bucket_1.txt");

    {
        let store = open_shard(&path);
        for i in 0..50 {
            put(&store, &format!("key_{}", i), &format!("value {}", i));
        }
        for i in (0..50).step_by(2) {
            assert_eq!(store.delete(&format!("key_{}", i)).unwrap(), Deleted::Removed);
        }
    }

    {
        let store = open_shard(&path);
        assert_eq!(store.len(), 25);
        for i in 0..50 {
            let expected = (i % 2 == 1).then(|| format!("value {}", i));
            assert_eq!(store.get(&format!("key_{}", i)), expected, "key_{}", i);
        }
    }
}

/// The file holds exactly one `key<TAB>value` line per live entry
#[test]
fn test_file_layout() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bucket_2.txt");

    let store = open_shard(&path);
    put(&store, "b", "two words");
    put(&store, "a", "one");
    put(&store, "a", "uno");

    let content = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.sort();
    assert_eq!(lines, vec!["a\tuno", "b\ttwo words"]);
}

/// Hand-edited files with junk lines still load
#[test]
fn test_tolerant_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bucket_3.txt");
    fs::write(&path, "1\tone\n\nnot a record\n2\ttwo\n").unwrap();

    let backend = RewriteFile::new(&path).unwrap();
    let (store, stats) = ShardStore::open(3, Box::new(backend)).unwrap();

    assert!(stats.file_found);
    assert_eq!(stats.entries_loaded, 2);
    assert_eq!(stats.lines_skipped, 2);
    assert_eq!(store.get("2"), Some("two".to_string()));
}

/// Every bucket of a cluster gets its own file under the data directory
#[test]
fn test_cluster_layout_one_file_per_bucket() {
    let temp_dir = TempDir::new().unwrap();
    let config = ClusterConfig::new()
        .with_num_buckets(4)
        .with_data_dir(temp_dir.path().join("data"));
    let router = config.router().unwrap();

    let stores: Vec<ShardStore> = (0..config.num_buckets)
        .map(|i| {
            let backend = RewriteFile::new(config.bucket_file(i)).unwrap();
            ShardStore::open(i, Box::new(backend)).unwrap().0
        })
        .collect();

    for i in 0..200 {
        let key = i.to_string();
        put(&stores[router.shard_of(&key)], &key, "v");
    }

    let total: usize = stores.iter().map(|s| s.len()).sum();
    assert_eq!(total, 200);
    for i in 0..config.num_buckets {
        assert!(config.bucket_file(i).exists(), "bucket_{} missing", i);
    }
}
