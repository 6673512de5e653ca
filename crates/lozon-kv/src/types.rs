//! KV store data types

use crate::error::KvError;
use std::fmt;

/// Index of a shard (bucket) in `[0, N)`
pub type ShardId = usize;

/// Key type for the store
///
/// Keys are single protocol tokens, so they are non-empty and contain neither
/// the space separator nor the tab/newline persistence delimiters. Other
/// characters, Unicode whitespace included, are stored as given.
/// Ordering is byte-wise lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KvKey(String);

impl KvKey {
    /// Create a new key, validating its characters
    pub fn new(key: impl Into<String>) -> Result<Self, KvError> {
        let key = key.into();
        if key.is_empty() {
            return Err(KvError::EmptyKey);
        }
        if key.contains([' ', '\t', '\n', '\r']) {
            return Err(KvError::InvalidKey(key));
        }
        Ok(Self(key))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for KvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value type for the store
///
/// Values may contain spaces but never the tab field separator or the
/// newline record delimiter of the persistence format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvValue(String);

impl KvValue {
    pub fn new(value: impl Into<String>) -> Result<Self, KvError> {
        let value = value.into();
        if value.is_empty() || value.contains(['\t', '\n', '\r']) {
            return Err(KvError::InvalidValue);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for KvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record of a range query, tagged with the shard that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry {
    pub key: String,
    pub value: String,
    pub shard: ShardId,
}
