//! KV store error types

use crate::persistence::PersistenceError;
use thiserror::Error;

/// Errors specific to KV store operations
#[derive(Error, Debug)]
pub enum KvError {
    #[error("Empty key not allowed")]
    EmptyKey,

    #[error("Invalid key {0:?}: keys may not contain whitespace")]
    InvalidKey(String),

    #[error("Invalid value: values must be non-empty and may not contain tab or newline")]
    InvalidValue,

    #[error("Shard count must be at least 1")]
    InvalidShardCount,

    #[error("Shard {shard} out of range (cluster has {num_shards} shards)")]
    ShardOutOfRange { shard: usize, num_shards: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}
