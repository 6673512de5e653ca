//! Coordinator operation log
//!
//! Append-only text file with one timestamped line per routed operation,
//! truncated when the coordinator starts. Every line is mirrored to
//! `tracing`. A failed write is logged and never fails the request.

use parking_lot::Mutex;
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Longest value prefix written to the log
pub const VALUE_PREVIEW_CHARS: usize = 50;

/// Append-only operation log
pub struct OpLog {
    sink: Option<(PathBuf, Mutex<BufWriter<File>>)>,
}

impl OpLog {
    /// Create (or truncate) the log at `path`, creating its directory
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            sink: Some((path.to_path_buf(), Mutex::new(BufWriter::new(file)))),
        })
    }

    /// Log that only goes to `tracing`
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Append one line
    pub fn record(&self, message: impl Display) {
        self.record_all(std::iter::once(message));
    }

    /// Append several lines with a single flush
    pub fn record_all<I>(&self, messages: I)
    where
        I: IntoIterator,
        I::Item: Display,
    {
        let mut writer = self.sink.as_ref().map(|(path, file)| (path, file.lock()));
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f");

        let mut failed = None;
        for message in messages {
            info!("{}", message);
            if let Some((_, file)) = writer.as_mut().filter(|_| failed.is_none()) {
                if let Err(e) = writeln!(file, "{} {}", timestamp, message) {
                    failed = Some(e);
                }
            }
        }

        if let Some((path, mut file)) = writer {
            let result = match failed {
                Some(e) => Err(e),
                None => file.flush(),
            };
            if let Err(e) = result {
                warn!("Failed to write operation log {}: {}", path.display(), e);
            }
        }
    }
}

/// First `VALUE_PREVIEW_CHARS` characters of `value`
pub fn preview(value: &str) -> &str {
    match value.char_indices().nth(VALUE_PREVIEW_CHARS) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
