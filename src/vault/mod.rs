//! Vaults: registered root directories with an index, a knowledge graph,
//! and the projects they contain.

pub mod manager;
pub mod queue;

pub use manager::VaultManager;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::fs::json::JsonDocument;
use crate::fs::paths::{is_descendant, relative_to_root};
use crate::graph::KnowledgeGraph;
use crate::indexer::Indexer;
use crate::models::{FileKind, VaultIndex};
use crate::validation::validate_name;
use crate::workspace::{workspace_name_from_path, Workspace};

/// `.vault_config.json` at the vault root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub name: String,
    #[serde(default)]
    pub projects: BTreeMap<String, String>,
}

impl JsonDocument for VaultConfig {}

/// Why a project could not be added to a vault.
///
/// `OutsideVault` is the sentinel the VaultManager reacts to by creating a
/// wrapper vault at the project's parent directory.
#[derive(Debug, Error)]
pub enum AddProjectError {
    #[error("project path {path} is not inside vault '{vault}'")]
    OutsideVault { vault: String, path: PathBuf },
    #[error("project '{0}' already exists in this vault")]
    Duplicate(String),
    #[error("invalid project name: {0}")]
    InvalidName(String),
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// A root directory owning its config, index, knowledge graph, and the
/// relative paths of the projects inside it.
///
/// Vault methods are not internally synchronized; the VaultManager
/// serializes all write-side access through its queue.
#[derive(Debug)]
pub struct Vault {
    name: String,
    root: PathBuf,
    projects: BTreeMap<String, String>,
    index: VaultIndex,
    graph: KnowledgeGraph,
}

impl Vault {
    /// Create a handle for `root`, creating the directory when missing.
    /// On-disk config and index are not touched until loaded or saved.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create vault directory {}", root.display()))?;
        Ok(Self {
            name: name.into(),
            root,
            projects: BTreeMap::new(),
            index: VaultIndex::default(),
            graph: KnowledgeGraph::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(".vault_config.json")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(".vault_index.json")
    }

    pub fn get_index(&self) -> &VaultIndex {
        &self.index
    }

    pub fn knowledge_graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn knowledge_graph_mut(&mut self) -> &mut KnowledgeGraph {
        &mut self.graph
    }

    /// Read `.vault_config.json`, falling back to in-memory state on a
    /// missing or corrupt file. The registry name stays authoritative.
    pub fn load_config(&mut self) {
        let config = VaultConfig::load(&self.config_path());
        if !config.projects.is_empty() || !config.name.is_empty() {
            self.projects = config.projects;
        }
    }

    /// Write `.vault_config.json`.
    pub fn save_config(&self) -> Result<()> {
        let config = VaultConfig {
            name: self.name.clone(),
            projects: self.projects.clone(),
        };
        config.save(&self.config_path())
    }

    /// Read `.vault_index.json`, falling back to an empty index.
    pub fn load_index(&mut self) {
        self.index = VaultIndex::load(&self.index_path());
    }

    /// Write `.vault_index.json`.
    pub fn save_index(&self) -> Result<()> {
        self.index.save(&self.index_path())
    }

    /// Scan the vault directory, replace the index and graph with the
    /// result, and persist the new index.
    pub fn update_index(&mut self) -> Result<()> {
        let report = Indexer::new().scan(&self.root)?;
        self.install_scan(report.index, report.graph);
        self.save_index()
    }

    /// Install an index/graph pair produced elsewhere (the background
    /// worker) as the vault's current state. Single atomic swap.
    ///
    /// The incoming graph is marked dirty unconditionally: a rebuild that
    /// extracted no edges still replaced whatever the graph view renders.
    pub fn install_scan(&mut self, index: VaultIndex, mut graph: KnowledgeGraph) {
        graph.mark_dirty();
        self.index = index;
        self.graph = graph;
    }

    /// Rebuild the knowledge graph from the current index's documents,
    /// clearing it first. Unreadable documents are skipped.
    pub fn update_knowledge_graph(&mut self) {
        let indexer = Indexer::new();
        let mut graph = KnowledgeGraph::new();

        // Vault-wide image index for resolving embeds.
        let image_index: BTreeMap<String, String> = self
            .index
            .files
            .iter()
            .filter(|(_, info)| info.kind == FileKind::Image)
            .map(|(rel, info)| (info.name.clone(), rel.clone()))
            .collect();

        let documents: Vec<String> = self.index.document_paths().map(String::from).collect();
        for rel in documents {
            let path = self.root.join(&rel);
            let Ok(content) = fs::read_to_string(&path) else {
                info!(file = %path.display(), "skipping unreadable document during graph rebuild");
                continue;
            };
            let extracted = indexer.extract(&content);
            for tag in &extracted.tags {
                graph.add_tag(&rel, tag);
            }
            for target in &extracted.links {
                graph.add_link(&rel, target);
            }
            for reference in &extracted.references {
                graph.add_reference(&rel, reference);
            }
            for embed in &extracted.embeds {
                if let Some(image_rel) = image_index.get(embed.as_str()) {
                    graph.add_link(&rel, image_rel);
                }
            }
        }

        // Even an empty rebuild invalidates what consumers last rendered.
        graph.mark_dirty();
        self.graph = graph;
    }

    /// Register a project living inside this vault.
    ///
    /// Returns the project's vault-relative path on success. A path outside
    /// the vault root yields [`AddProjectError::OutsideVault`], which the
    /// caller uses to decide on wrapper-vault creation.
    pub fn add_project(&mut self, name: &str, path: &Path) -> Result<String, AddProjectError> {
        validate_name(name).map_err(|err| AddProjectError::InvalidName(err.to_string()))?;
        if self.projects.contains_key(name) {
            return Err(AddProjectError::Duplicate(name.to_string()));
        }
        if !is_descendant(&self.root, path) {
            return Err(AddProjectError::OutsideVault {
                vault: self.name.clone(),
                path: path.to_path_buf(),
            });
        }
        let rel = relative_to_root(&self.root, path).map_err(AddProjectError::Persistence)?;
        let rel = if rel.is_empty() { ".".to_string() } else { rel };
        self.projects.insert(name.to_string(), rel.clone());
        self.save_config()?;
        Ok(rel)
    }

    /// Drop a project from the vault. Returns false for unknown names.
    pub fn remove_project(&mut self, name: &str) -> Result<bool> {
        if self.projects.remove(name).is_none() {
            info!(project = name, vault = %self.name, "no such project");
            return Ok(false);
        }
        self.save_config()?;
        Ok(true)
    }

    pub fn get_project(&self, name: &str) -> Option<&str> {
        self.projects.get(name).map(String::as_str)
    }

    pub fn get_project_names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    pub fn projects(&self) -> &BTreeMap<String, String> {
        &self.projects
    }

    /// Absolute path of a named project. Always absolute, in every branch.
    pub fn get_project_path(&self, name: &str) -> Option<PathBuf> {
        let rel = self.projects.get(name)?;
        if rel == "." {
            return Some(self.root.clone());
        }
        Some(self.root.join(rel))
    }

    /// True iff the file's vault-relative path is present in the index.
    pub fn contains_file(&self, abs_path: &Path) -> bool {
        let Ok(rel) = relative_to_root(&self.root, abs_path) else {
            return false;
        };
        self.index.contains(&rel)
    }

    /// Backlinks for a vault-relative path.
    ///
    /// Links are stored exactly as written inside `[[...]]`, so this checks
    /// both the relative path and its file stem (`notes/b.md` and `b`).
    pub fn get_backlinks(&self, rel_path: &str) -> std::collections::BTreeSet<String> {
        let mut backlinks = self.graph.get_backlinks(rel_path);
        if let Some(stem) = Path::new(rel_path).file_stem() {
            backlinks.extend(self.graph.get_backlinks(&stem.to_string_lossy()));
        }
        backlinks
    }

    /// Create an empty workspace file in the vault. Returns false when the
    /// name is invalid or the workspace already exists.
    pub fn add_workspace(&self, name: &str) -> Result<bool> {
        if let Err(err) = validate_name(name) {
            info!(workspace = name, error = %err, "rejected workspace name");
            return Ok(false);
        }
        let path = Workspace::file_path(&self.root, name);
        if path.exists() {
            info!(workspace = name, vault = %self.name, "workspace already exists");
            return Ok(false);
        }
        Workspace::new(name, &self.root).persist()?;
        Ok(true)
    }

    /// Delete a workspace file. Returns false for unknown names.
    pub fn remove_workspace(&self, name: &str) -> Result<bool> {
        let path = Workspace::file_path(&self.root, name);
        if !path.exists() {
            info!(workspace = name, vault = %self.name, "no such workspace");
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path.display()))?;
        Ok(true)
    }

    /// Names of all workspaces persisted in this vault, sorted.
    ///
    /// Discovery matches on file names, so vault roots containing glob
    /// metacharacters behave like any other root.
    pub fn get_workspace_names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| workspace_name_from_path(&entry.path()))
            .collect();
        names.sort();
        names
    }
}
