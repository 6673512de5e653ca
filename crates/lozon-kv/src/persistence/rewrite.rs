//! Full-rewrite file backend
//!
//! Every mutation serializes the whole shard to a temporary sibling file
//! (`bucket_0.txt.tmp`), fsyncs it and renames it over the target, so the
//! target always holds a complete state.

use super::format::{read_entries, write_entries};
use super::{LoadStats, LoadedState, Persistence, PersistenceError, Result};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tab-separated shard file, rewritten in full on every mutation
#[derive(Debug, Clone)]
pub struct RewriteFile {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl RewriteFile {
    /// Create a backend for `path`, creating the parent directory if needed
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::DataDirectory(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = path.with_file_name(tmp_name);

        Ok(Self { path, tmp_path })
    }

    /// Path of the shard file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for RewriteFile {
    fn load(&self) -> Result<LoadedState> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No shard file at {}", self.path.display());
                return Ok(LoadedState::default());
            }
            Err(e) => return Err(e.into()),
        };

        let (entries, stats) = read_entries(BufReader::new(file))?;
        Ok(LoadedState {
            entries,
            stats: LoadStats {
                file_found: true,
                ..stats
            },
        })
    }

    fn rewrite(&self, entries: &HashMap<String, String>) -> Result<()> {
        let file = File::create(&self.tmp_path)?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        write_entries(&mut writer, entries)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&self.tmp_path, &self.path)?;
        debug!("Rewrote {} ({} entries)", self.path.display(), entries.len());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
