//! Shard file format
//!
//! One record per line: `key<TAB>value<LF>`. No header, no checksum. The line
//! is split at the first tab; blank lines and lines without a tab are
//! skipped when loading.

use std::collections::HashMap;
use std::io::{BufRead, Write};

use super::{LoadStats, Result};

/// Field separator between key and value
pub const FIELD_SEPARATOR: char = '\t';

/// Parse one line into a `(key, value)` pair
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    line.split_once(FIELD_SEPARATOR)
}

/// Read every record from `reader`, later lines overriding earlier ones
pub fn read_entries<R: BufRead>(reader: R) -> Result<(HashMap<String, String>, LoadStats)> {
    let mut entries = HashMap::new();
    let mut stats = LoadStats::default();

    for line in reader.lines() {
        let line = line?;
        match parse_line(&line) {
            Some((key, value)) => {
                entries.insert(key.to_string(), value.to_string());
            }
            None => stats.lines_skipped += 1,
        }
    }

    stats.entries_loaded = entries.len();
    Ok((entries, stats))
}

/// Write every record to `writer`, in map iteration order
pub fn write_entries<W: Write>(writer: &mut W, entries: &HashMap<String, String>) -> Result<()> {
    for (key, value) in entries {
        writeln!(writer, "{}{}{}", key, FIELD_SEPARATOR, value)?;
    }
    Ok(())
}
