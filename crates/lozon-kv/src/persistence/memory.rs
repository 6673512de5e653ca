//! In-memory persistence backend (nothing survives a restart)

use super::{LoadedState, Persistence, Result};
use std::collections::HashMap;

/// Backend that keeps no durable state
#[derive(Debug, Default)]
pub struct MemoryPersistence;

impl MemoryPersistence {
    pub fn new() -> Self {
        Self
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<LoadedState> {
        Ok(LoadedState::default())
    }

    fn rewrite(&self, _entries: &HashMap<String, String>) -> Result<()> {
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
