//! Project records as stored in the project registry.

use serde::{Deserialize, Serialize};

/// A tracked project: a named subtree with build/run metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub path: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
}

impl Project {
    pub fn new(path: impl Into<String>, language: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            version: version.into(),
            build_command: None,
            run_command: None,
        }
    }
}

/// On-disk shape of one registry entry.
///
/// Older configs stored a bare path string per project; current configs
/// store the full object. Both are accepted on read; writes always emit the
/// object form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectEntry {
    Full(Project),
    Legacy(String),
}

impl ProjectEntry {
    /// Normalize to the object form.
    pub fn into_project(self) -> Project {
        match self {
            ProjectEntry::Full(project) => project,
            ProjectEntry::Legacy(path) => Project::new(path, "", ""),
        }
    }

    /// The entry's path, if it has one worth resolving.
    pub fn path(&self) -> Option<&str> {
        let path = match self {
            ProjectEntry::Full(project) => project.path.as_str(),
            ProjectEntry::Legacy(path) => path.as_str(),
        };
        if path.is_empty() {
            None
        } else {
            Some(path)
        }
    }
}
