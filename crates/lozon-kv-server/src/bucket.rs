//! Bucket service
//!
//! Serves one shard store over the bucket dialect (PUT / GET / DEL / RANGE).
//! Store calls run on the blocking pool: mutations hold the shard lock while
//! the backing file is rewritten.

use crate::server::Service;
use async_trait::async_trait;
use lozon_kv::persistence::{LoadStats, MemoryPersistence, Persistence, RewriteFile};
use lozon_kv::protocol::{Dialect, Request, Response};
use lozon_kv::store::{Deleted, ShardStore};
use lozon_kv::{ClusterConfig, KvError, KvKey, KvValue, ShardId};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Network front of a single shard
pub struct BucketService {
    store: Arc<ShardStore>,
}

impl BucketService {
    /// Wrap an opened store
    pub fn new(store: ShardStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Open bucket `shard` of `config`, file-backed unless `in_memory`
    pub fn open(
        config: &ClusterConfig,
        shard: ShardId,
        in_memory: bool,
    ) -> Result<(Self, LoadStats), KvError> {
        config.check_shard(shard)?;

        let persistence: Box<dyn Persistence> = if in_memory {
            Box::new(MemoryPersistence::new())
        } else {
            Box::new(RewriteFile::new(config.bucket_file(shard))?)
        };

        let (store, stats) = ShardStore::open(shard, persistence)?;
        Ok((Self::new(store), stats))
    }

    /// The underlying store
    pub fn store(&self) -> &ShardStore {
        &self.store
    }

    /// Run `f` against the store on the blocking pool
    async fn with_store<F>(&self, f: F) -> Response
    where
        F: FnOnce(&ShardStore) -> Response + Send + 'static,
    {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || f(store.as_ref())).await {
            Ok(response) => response,
            Err(e) => {
                error!("Shard {} store task failed: {}", self.store.shard_id(), e);
                Response::Error
            }
        }
    }
}

fn put(store: &ShardStore, key: String, value: String) -> Response {
    let (key, value) = match (KvKey::new(key), KvValue::new(value)) {
        (Ok(key), Ok(value)) => (key, value),
        (Err(e), _) | (_, Err(e)) => {
            debug!("Shard {} rejected PUT: {}", store.shard_id(), e);
            return Response::Error;
        }
    };

    match store.put(&key, value) {
        Ok(()) => Response::Ok,
        Err(e) => {
            warn!("Shard {} PUT {} failed: {}", store.shard_id(), key, e);
            Response::Error
        }
    }
}

fn delete(store: &ShardStore, key: &str) -> Response {
    match store.delete(key) {
        Ok(Deleted::Removed) => Response::Ok,
        Ok(Deleted::NotFound) => Response::NotFound,
        Err(e) => {
            warn!("Shard {} DEL {} failed: {}", store.shard_id(), key, e);
            Response::Error
        }
    }
}

#[async_trait]
impl Service for BucketService {
    fn dialect(&self) -> Dialect {
        Dialect::Bucket
    }

    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Put { key, value } => self.with_store(move |s| put(s, key, value)).await,
            Request::Get { key } => {
                self.with_store(move |s| match s.get(&key) {
                    Some(value) => Response::Value(value),
                    None => Response::NotFound,
                })
                .await
            }
            Request::Del { key } => self.with_store(move |s| delete(s, &key)).await,
            Request::Range { low, high } => {
                self.with_store(move |s| Response::Range(s.range(&low, &high)))
                    .await
            }
        }
    }
}
