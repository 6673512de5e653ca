//! Deterministic hash router
//!
//! Maps every key to exactly one shard with a base-31 polynomial hash. The
//! accumulator is reduced modulo a large prime at every step, then the result
//! is compressed to the shard count. The mapping depends only on the key and
//! the shard count, so changing the shard count remaps almost every key.

use crate::error::KvError;
use crate::types::ShardId;
use std::num::NonZeroUsize;

/// Polynomial base
const HASH_BASE: u64 = 31;

/// Prime modulus applied after every accumulator step
const HASH_MODULUS: u64 = 1_000_000_007;

/// Hash a key to its pre-reduction accumulator value
///
/// Iterates Unicode scalar values. The accumulator stays below
/// `HASH_MODULUS` after every step, so `h * 31 + c` fits easily in a u64.
#[inline]
pub fn hash_key(key: &str) -> u64 {
    key.chars()
        .fold(0u64, |h, c| (h * HASH_BASE + c as u64) % HASH_MODULUS)
}

/// Routes keys to shards for a fixed shard count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashRouter {
    num_shards: NonZeroUsize,
}

impl HashRouter {
    /// Create a router for `num_shards` shards
    pub fn new(num_shards: usize) -> Result<Self, KvError> {
        NonZeroUsize::new(num_shards)
            .map(|num_shards| Self { num_shards })
            .ok_or(KvError::InvalidShardCount)
    }

    /// Get the shard owning `key`
    #[inline]
    pub fn shard_of(&self, key: &str) -> ShardId {
        (hash_key(key) % self.num_shards.get() as u64) as ShardId
    }

    /// Get number of shards
    pub fn num_shards(&self) -> usize {
        self.num_shards.get()
    }

    /// All shard ids, in order
    pub fn shards(&self) -> std::ops::Range<ShardId> {
        0..self.num_shards.get()
    }
}
