//! JSON persistence helpers shared by every config document in the core.
//!
//! All on-disk JSON is UTF-8, pretty-printed with a 4-space indent, and
//! written via a temp file followed by an atomic rename so readers never
//! observe a half-written document. A failed write is retried once before
//! the error is surfaced to the caller.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

/// Serialize a value as pretty JSON with 4-space indentation.
pub fn to_pretty_string<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .context("Failed to serialize value to JSON")?;
    Ok(String::from_utf8(buf).context("Serialized JSON was not valid UTF-8")?)
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    // Temp file in the same directory so the rename stays on one filesystem.
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    std::io::Write::write_all(&mut tmp, content.as_bytes())
        .with_context(|| format!("Failed to write temp file for {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Write a value as pretty JSON, atomically, retrying once on failure.
pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = to_pretty_string(value)?;
    match write_atomic(path, &content) {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!(path = %path.display(), error = %first, "config write failed, retrying once");
            write_atomic(path, &content)
        }
    }
}

/// Read a JSON file, falling back to the type's default when the file is
/// missing or unparseable. Parse failures are logged at warn; the in-memory
/// state stays authoritative and the next successful write heals the file.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return T::default(),
    };
    match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "invalid config JSON, using defaults");
            T::default()
        }
    }
}

/// Unified interface for config documents persisted as JSON files.
///
/// Mirrors the load/save pattern used across the core: `load` tolerates a
/// missing file by returning the default document, while `save` goes through
/// the pretty/atomic/retry-once write path.
pub trait JsonDocument: Serialize + DeserializeOwned + Default {
    /// Load the document from `path`, or its default when absent/corrupt.
    fn load(path: &Path) -> Self {
        read_json_or_default(path)
    }

    /// Load the document, failing when the file is missing or invalid.
    fn load_required(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save the document to `path`.
    fn save(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, self)
    }
}
