//! Storage core for the lozon hash store
//!
//! # Features
//! - Deterministic polynomial hash router mapping keys to buckets
//! - Per-bucket shard store with full-rewrite file persistence
//! - Pluggable persistence backends behind the `Persistence` trait
//! - Line-oriented wire protocol shared by coordinator and buckets
//! - Cluster configuration built once at startup

pub mod config;
pub mod error;
pub mod persistence;
pub mod protocol;
pub mod router;
pub mod store;
pub mod types;

pub use config::ClusterConfig;
pub use error::KvError;
pub use router::HashRouter;
pub use store::ShardStore;
pub use types::{KvKey, KvValue, RangeEntry, ShardId};
