//! Bucket and coordinator servers for the lozon hash store
//!
//! Both processes share one connection loop (`server`): accept, read one
//! request line, dispatch it to a `Service`, write the response, close.
//!
//! - **`bucket`**: serves one shard store over the bucket dialect
//! - **`coordinator`**: routes client requests to buckets and merges range
//!   results
//! - **`oplog`**: the coordinator's append-only operation log

pub mod bucket;
pub mod coordinator;
pub mod oplog;
pub mod server;

pub use bucket::BucketService;
pub use coordinator::{Coordinator, RangeOutcome};
pub use oplog::OpLog;
pub use server::{KvServer, ServerError, Service};
