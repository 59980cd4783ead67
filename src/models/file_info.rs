//! Per-file metadata captured by the indexer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::fs::json::JsonDocument;

/// File classification derived from the lowercase extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// `.md`, `.txt`; scanned for tags, links, and references.
    Document,
    /// `.png`, `.jpg`, `.jpeg`, `.gif`
    Image,
    /// `.py`, `.js`, `.html`, `.css`
    Code,
    /// Everything else.
    Other,
}

impl FileKind {
    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "md" | "txt" => FileKind::Document,
            "png" | "jpg" | "jpeg" | "gif" => FileKind::Image,
            "py" | "js" | "html" | "css" => FileKind::Code,
            _ => FileKind::Other,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Document => write!(f, "document"),
            FileKind::Image => write!(f, "image"),
            FileKind::Code => write!(f, "code"),
            FileKind::Other => write!(f, "other"),
        }
    }
}

/// Metadata for one indexed file.
///
/// `tags` and `links` are populated for documents only and are kept sorted
/// so identical directory contents always index to identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name including extension.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Creation timestamp; absent on platforms that do not report one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

/// Snapshot map from vault-relative path to [`FileInfo`], persisted as
/// `.vault_index.json`. Rebuilt wholesale by the indexer, never patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultIndex {
    #[serde(default)]
    pub files: BTreeMap<String, FileInfo>,
}

impl JsonDocument for VaultIndex {}

impl VaultIndex {
    pub fn contains(&self, rel_path: &str) -> bool {
        self.files.contains_key(rel_path)
    }

    pub fn get(&self, rel_path: &str) -> Option<&FileInfo> {
        self.files.get(rel_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Relative paths of all indexed documents.
    pub fn document_paths(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|(_, info)| info.kind == FileKind::Document)
            .map(|(path, _)| path.as_str())
    }
}
