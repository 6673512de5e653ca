//! Coordinator service
//!
//! Single entry point hiding the shard topology. Point operations go to the
//! one bucket the router picks; RANGE fans out to every bucket concurrently
//! and re-sorts the union. Each bucket call uses a fresh connection bounded
//! by the configured timeout. An unreachable bucket turns a point operation
//! into `ERROR` and contributes nothing to a RANGE.

use crate::oplog::{preview, OpLog};
use crate::server::Service;
use async_trait::async_trait;
use futures::future::join_all;
use lozon_kv::protocol::{Dialect, Request, Response};
use lozon_kv::{ClusterConfig, HashRouter, KvError, RangeEntry, ShardId};
use lozon_kv_client::KvClient;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

/// Merged result of a range fan-out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeOutcome {
    /// Matching records from every reachable bucket, sorted by key
    pub entries: Vec<RangeEntry>,

    /// Buckets that failed or timed out
    pub unreachable: Vec<ShardId>,
}

impl RangeOutcome {
    /// Wire response; unreachable buckets are not reported
    pub fn into_response(self) -> Response {
        Response::Range(
            self.entries
                .into_iter()
                .map(|entry| (entry.key, entry.value))
                .collect(),
        )
    }
}

/// Routing front of the cluster
pub struct Coordinator {
    router: HashRouter,
    buckets: Vec<KvClient>,
    bucket_files: Vec<PathBuf>,
    oplog: OpLog,
}

impl Coordinator {
    /// Coordinator for the buckets at the ports `config` assigns
    pub fn new(config: &ClusterConfig, oplog: OpLog) -> Result<Self, KvError> {
        Self::with_bucket_addrs(config, config.bucket_addrs(), oplog)
    }

    /// Coordinator for buckets at explicit addresses, indexed by shard id
    pub fn with_bucket_addrs(
        config: &ClusterConfig,
        addrs: Vec<SocketAddr>,
        oplog: OpLog,
    ) -> Result<Self, KvError> {
        let router = config.router()?;
        if addrs.len() != router.num_shards() {
            return Err(KvError::InvalidConfig(
                "bucket address count does not match the bucket count",
            ));
        }

        let buckets = addrs
            .into_iter()
            .map(|addr| KvClient::bucket(addr).with_timeout(config.bucket_timeout))
            .collect();
        let bucket_files = router.shards().map(|i| config.bucket_file(i)).collect();

        Ok(Self {
            router,
            buckets,
            bucket_files,
            oplog,
        })
    }

    /// Bucket owning `key`
    pub fn shard_for(&self, key: &str) -> ShardId {
        self.router.shard_of(key)
    }

    /// Get number of buckets
    pub fn num_buckets(&self) -> usize {
        self.router.num_shards()
    }

    /// Send `request` to bucket `shard`; any failure becomes `ERROR`
    async fn forward(&self, shard: ShardId, request: &Request) -> Response {
        let bucket = &self.buckets[shard];
        match bucket.request(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Bucket {} at {} unavailable: {}", shard, bucket.addr(), e);
                Response::Error
            }
        }
    }

    fn file_of(&self, shard: ShardId) -> String {
        self.bucket_files[shard].display().to_string()
    }

    /// INSERT: route and forward as PUT
    pub async fn insert(&self, key: &str, value: &str) -> Response {
        let shard = self.shard_for(key);
        let request = Request::Put {
            key: key.to_string(),
            value: value.to_string(),
        };
        let response = self.forward(shard, &request).await;

        self.oplog.record(format_args!(
            "INSERT key={} bucket={} file={} value={}...",
            key,
            shard,
            self.file_of(shard),
            preview(value)
        ));
        response
    }

    /// SEARCH: route and forward as GET
    pub async fn search(&self, key: &str) -> Response {
        let shard = self.shard_for(key);
        let request = Request::Get {
            key: key.to_string(),
        };
        let response = self.forward(shard, &request).await;

        match &response {
            Response::Value(value) => self.oplog.record(format_args!(
                "SEARCH key={} bucket={} file={} value={}...",
                key,
                shard,
                self.file_of(shard),
                preview(value)
            )),
            other => self.oplog.record(format_args!(
                "SEARCH key={} bucket={} file={} resp={}",
                key,
                shard,
                self.file_of(shard),
                other.encode().trim_end()
            )),
        }
        response
    }

    /// DELETE: route and forward as DEL
    pub async fn delete(&self, key: &str) -> Response {
        let shard = self.shard_for(key);
        let request = Request::Del {
            key: key.to_string(),
        };
        let response = self.forward(shard, &request).await;

        self.oplog.record(format_args!(
            "DELETE key={} bucket={} file={} resp={}",
            key,
            shard,
            self.file_of(shard),
            response.encode().trim_end()
        ));
        response
    }

    /// RANGE: fan out to every bucket and merge by key
    ///
    /// Every record a bucket returns is kept, even one whose key routes
    /// elsewhere (left behind by an earlier bucket count).
    pub async fn range(&self, low: &str, high: &str) -> RangeOutcome {
        let request = Request::Range {
            low: low.to_string(),
            high: high.to_string(),
        };

        let replies = join_all(self.router.shards().map(|shard| {
            let request = &request;
            async move { (shard, self.forward(shard, request).await) }
        }))
        .await;

        let mut outcome = RangeOutcome::default();
        for (shard, response) in replies {
            match response {
                Response::Range(pairs) => outcome.entries.extend(
                    pairs
                        .into_iter()
                        .map(|(key, value)| RangeEntry { key, value, shard }),
                ),
                other => {
                    warn!("Bucket {} gave no range result: {:?}", shard, other);
                    outcome.unreachable.push(shard);
                }
            }
        }

        outcome.entries.sort_by(|a, b| a.key.cmp(&b.key));

        self.oplog.record_all(outcome.entries.iter().map(|entry| {
            format!(
                "RANGE key={} bucket={} file={} value={}...",
                entry.key,
                entry.shard,
                self.file_of(entry.shard),
                preview(&entry.value)
            )
        }));
        outcome
    }
}

#[async_trait]
impl Service for Coordinator {
    fn dialect(&self) -> Dialect {
        Dialect::Coordinator
    }

    async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Put { key, value } => self.insert(&key, &value).await,
            Request::Get { key } => self.search(&key).await,
            Request::Del { key } => self.delete(&key).await,
            Request::Range { low, high } => self.range(&low, &high).await.into_response(),
        }
    }
}
