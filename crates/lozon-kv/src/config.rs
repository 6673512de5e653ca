//! Cluster configuration
//!
//! Built once at process start and handed to every component; nothing reads
//! ports, directories or the bucket count from globals.

use crate::error::KvError;
use crate::router::HashRouter;
use crate::types::ShardId;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Topology and resource limits shared by buckets and the coordinator
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Number of bucket processes (default: 4)
    pub num_buckets: usize,

    /// Address every process binds to (default: 127.0.0.1)
    pub host: IpAddr,

    /// Bucket `i` listens on `bucket_base_port + i` (default: 9100)
    pub bucket_base_port: u16,

    /// Coordinator port (default: 9000)
    pub coordinator_port: u16,

    /// Directory holding `bucket_<i>.txt` (default: ./data)
    pub data_dir: PathBuf,

    /// Directory holding the coordinator's `run.log` (default: ./logs)
    pub log_dir: PathBuf,

    /// Timeout for one coordinator -> bucket exchange (default: 2s)
    pub bucket_timeout: Duration,

    /// Maximum connections served concurrently per process (default: 1024)
    pub max_connections: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            num_buckets: 4,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            bucket_base_port: 9100,
            coordinator_port: 9000,
            data_dir: PathBuf::from("./data"),
            log_dir: PathBuf::from("./logs"),
            bucket_timeout: Duration::from_secs(2),
            max_connections: 1024,
        }
    }
}

impl ClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of buckets
    pub fn with_num_buckets(mut self, num_buckets: usize) -> Self {
        self.num_buckets = num_buckets;
        self
    }

    /// Set bind host
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Set first bucket port
    pub fn with_bucket_base_port(mut self, port: u16) -> Self {
        self.bucket_base_port = port;
        self
    }

    /// Set coordinator port
    pub fn with_coordinator_port(mut self, port: u16) -> Self {
        self.coordinator_port = port;
        self
    }

    /// Set data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set log directory
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set coordinator -> bucket timeout
    pub fn with_bucket_timeout(mut self, timeout: Duration) -> Self {
        self.bucket_timeout = timeout;
        self
    }

    /// Set connection concurrency limit
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Check invariants: at least one bucket, every bucket port fits in u16,
    /// a non-zero connection limit
    pub fn validate(&self) -> Result<(), KvError> {
        if self.num_buckets == 0 {
            return Err(KvError::InvalidShardCount);
        }
        let last_port = self.bucket_base_port as usize + self.num_buckets - 1;
        if last_port > u16::MAX as usize {
            return Err(KvError::InvalidConfig("bucket ports exceed 65535"));
        }
        if self.max_connections == 0 {
            return Err(KvError::InvalidConfig("max_connections must be at least 1"));
        }
        Ok(())
    }

    /// Router for this cluster's bucket count
    pub fn router(&self) -> Result<HashRouter, KvError> {
        HashRouter::new(self.num_buckets)
    }

    /// Fail unless `shard` names a bucket of this cluster
    pub fn check_shard(&self, shard: ShardId) -> Result<(), KvError> {
        if shard >= self.num_buckets {
            return Err(KvError::ShardOutOfRange {
                shard,
                num_shards: self.num_buckets,
            });
        }
        Ok(())
    }

    /// Listen address of bucket `shard`
    pub fn bucket_addr(&self, shard: ShardId) -> SocketAddr {
        SocketAddr::new(self.host, self.bucket_base_port.wrapping_add(shard as u16))
    }

    /// Listen addresses of all buckets, indexed by shard id
    pub fn bucket_addrs(&self) -> Vec<SocketAddr> {
        (0..self.num_buckets).map(|i| self.bucket_addr(i)).collect()
    }

    /// Listen address of the coordinator
    pub fn coordinator_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.coordinator_port)
    }

    /// Backing file of bucket `shard`
    pub fn bucket_file(&self, shard: ShardId) -> PathBuf {
        self.data_dir.join(format!("bucket_{}.txt", shard))
    }

    /// Coordinator operation log
    pub fn oplog_file(&self) -> PathBuf {
        self.log_dir.join("run.log")
    }
}
