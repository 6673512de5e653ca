//! Persistence layer for shard stores
//!
//! A shard's backing state is loaded once at startup and rewritten in full
//! after every mutation. The request path only sees the `Persistence` trait,
//! so the on-disk strategy can change without touching the store.
//!
//! ## Backends
//!
//! - **`RewriteFile`**: one `key<TAB>value` line per entry, rewritten through
//!   a temporary sibling file and an atomic rename
//! - **`MemoryPersistence`**: keeps nothing, for in-memory operation and tests

pub mod format;
pub mod memory;
pub mod rewrite;

pub use memory::MemoryPersistence;
pub use rewrite::RewriteFile;

use std::collections::HashMap;
use thiserror::Error;

/// Result of loading a shard's backing state
#[derive(Debug, Default, Clone)]
pub struct LoadedState {
    /// Entries recovered from the backing store
    pub entries: HashMap<String, String>,

    /// Load statistics
    pub stats: LoadStats,
}

/// Load statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Whether a backing file was found
    pub file_found: bool,

    /// Number of entries loaded
    pub entries_loaded: usize,

    /// Number of blank or malformed lines skipped
    pub lines_skipped: usize,
}

/// Durable backing state of one shard
pub trait Persistence: Send + Sync {
    /// Load the full persisted state
    fn load(&self) -> Result<LoadedState>;

    /// Replace the persisted state with `entries`
    fn rewrite(&self, entries: &HashMap<String, String>) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data directory error: {0}")]
    DataDirectory(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
