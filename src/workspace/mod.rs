//! Workspaces: per-vault named session state (filesets, open files, layout).
//!
//! Each workspace is one JSON document at `<vault>/.workspace_<name>.json`.
//! The manager is scoped to a single vault at a time; switching vaults
//! reloads everything from disk. Exactly one workspace per vault is active,
//! and a `Default` workspace always exists after loading.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::fs::json::JsonDocument;
use crate::validation::validate_name;

/// Name of the workspace every vault is guaranteed to have.
pub const DEFAULT_WORKSPACE: &str = "Default";

/// Manager-level pointers persisted at `<vault>/workspace_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceManagerConfig {
    pub default_workspace: String,
    pub active_workspace: String,
}

impl Default for WorkspaceManagerConfig {
    fn default() -> Self {
        Self {
            default_workspace: DEFAULT_WORKSPACE.to_string(),
            active_workspace: DEFAULT_WORKSPACE.to_string(),
        }
    }
}

impl JsonDocument for WorkspaceManagerConfig {}

/// A named selection of filesets plus UI state, persisted per vault.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    pub vault_path: PathBuf,
    #[serde(default)]
    pub filesets: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_fileset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<serde_json::Value>,
    #[serde(default)]
    pub visible_docks: Vec<String>,
}

impl JsonDocument for Workspace {}

impl Workspace {
    pub fn new(name: impl Into<String>, vault_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            vault_path: vault_path.into(),
            ..Self::default()
        }
    }

    /// Path of the workspace file for `name` inside `vault_root`.
    pub fn file_path(vault_root: &Path, name: &str) -> PathBuf {
        vault_root.join(format!(".workspace_{name}.json"))
    }

    fn path(&self) -> PathBuf {
        Self::file_path(&self.vault_path, &self.name)
    }

    /// Persist this workspace to its vault.
    pub fn persist(&self) -> Result<()> {
        self.save(&self.path())
            .with_context(|| format!("Failed to persist workspace '{}'", self.name))
    }

    /// Create or replace a named fileset. Writes before reporting success.
    pub fn add_fileset(&mut self, name: &str, files: Vec<String>) -> Result<()> {
        self.filesets.insert(name.to_string(), files);
        self.persist()
    }

    /// Remove a fileset. Returns false for unknown names.
    pub fn remove_fileset(&mut self, name: &str) -> Result<bool> {
        if self.filesets.remove(name).is_none() {
            info!(workspace = %self.name, fileset = name, "no such fileset");
            return Ok(false);
        }
        if self.active_fileset.as_deref() == Some(name) {
            self.active_fileset = None;
        }
        self.persist()?;
        Ok(true)
    }

    /// Select the active fileset. Returns false for unknown names.
    pub fn set_active_fileset(&mut self, name: &str) -> Result<bool> {
        if !self.filesets.contains_key(name) {
            info!(workspace = %self.name, fileset = name, "no such fileset");
            return Ok(false);
        }
        self.active_fileset = Some(name.to_string());
        self.persist()?;
        Ok(true)
    }

    /// Files of the active fileset, in stored order. Empty when none is set.
    pub fn get_active_files(&self) -> Vec<String> {
        self.active_fileset
            .as_deref()
            .and_then(|name| self.filesets.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Persist the dock layout and visible-dock list.
    pub fn set_layout(&mut self, layout: serde_json::Value, visible_docks: Vec<String>) -> Result<()> {
        self.layout = Some(layout);
        self.visible_docks = visible_docks;
        self.persist()
    }

    pub fn get_layout(&self) -> (Option<&serde_json::Value>, &[String]) {
        (self.layout.as_ref(), &self.visible_docks)
    }
}

/// Per-vault workspace registry with an active-workspace pointer.
#[derive(Debug, Default)]
pub struct WorkspaceManager {
    vault_root: Option<PathBuf>,
    workspaces: BTreeMap<String, Workspace>,
    active: String,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the manager at a vault, reloading all workspace state from it.
    ///
    /// Reads `workspace_config.json`, repopulates from `.workspace_*.json`
    /// files, ensures `Default` exists, and falls the active pointer back to
    /// `Default` when the stored one no longer exists.
    pub fn set_vault(&mut self, vault_root: &Path) -> Result<()> {
        let config = WorkspaceManagerConfig::load(&vault_root.join("workspace_config.json"));

        self.workspaces.clear();
        self.vault_root = Some(vault_root.to_path_buf());

        // Match on file names rather than globbing the full path, which
        // breaks when the vault root contains glob metacharacters.
        let entries = fs::read_dir(vault_root)
            .with_context(|| format!("Failed to read {}", vault_root.display()))?;
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    warn!(error = %err, "unreadable vault entry");
                    continue;
                }
            };
            let Some(name) = workspace_name_from_path(&path) else {
                continue;
            };
            match Workspace::load_required(&path) {
                Ok(mut workspace) => {
                    // The file's location is authoritative for name and vault.
                    workspace.name = name.clone();
                    workspace.vault_path = vault_root.to_path_buf();
                    self.workspaces.insert(name, workspace);
                }
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping corrupt workspace file");
                }
            }
        }

        if !self.workspaces.contains_key(DEFAULT_WORKSPACE) {
            let workspace = Workspace::new(DEFAULT_WORKSPACE, vault_root);
            workspace.persist()?;
            self.workspaces.insert(DEFAULT_WORKSPACE.to_string(), workspace);
        }

        self.active = if self.workspaces.contains_key(&config.active_workspace) {
            config.active_workspace
        } else {
            DEFAULT_WORKSPACE.to_string()
        };
        self.save_config()
    }

    fn save_config(&self) -> Result<()> {
        let Some(root) = &self.vault_root else {
            return Ok(());
        };
        let config = WorkspaceManagerConfig {
            default_workspace: DEFAULT_WORKSPACE.to_string(),
            active_workspace: self.active.clone(),
        };
        config.save(&root.join("workspace_config.json"))
    }

    /// Create a workspace. Returns false on name conflict or invalid name.
    pub fn add_workspace(&mut self, name: &str) -> Result<bool> {
        let Some(root) = self.vault_root.clone() else {
            info!("no vault selected");
            return Ok(false);
        };
        if let Err(err) = validate_name(name) {
            info!(workspace = name, error = %err, "rejected workspace name");
            return Ok(false);
        }
        if self.workspaces.contains_key(name) {
            info!(workspace = name, "workspace already exists");
            return Ok(false);
        }
        let workspace = Workspace::new(name, root);
        workspace.persist()?;
        self.workspaces.insert(name.to_string(), workspace);
        Ok(true)
    }

    /// Delete a workspace and its file. The `Default` workspace cannot be
    /// removed; removing the active workspace falls back to `Default`.
    pub fn remove_workspace(&mut self, name: &str) -> Result<bool> {
        if name == DEFAULT_WORKSPACE {
            info!("refusing to remove the Default workspace");
            return Ok(false);
        }
        let Some(workspace) = self.workspaces.remove(name) else {
            info!(workspace = name, "no such workspace");
            return Ok(false);
        };
        let path = workspace.path();
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
        }
        if self.active == name {
            self.active = DEFAULT_WORKSPACE.to_string();
            self.save_config()?;
        }
        Ok(true)
    }

    /// Switch the active workspace. Returns false for unknown names.
    pub fn set_active_workspace(&mut self, name: &str) -> Result<bool> {
        if !self.workspaces.contains_key(name) {
            info!(workspace = name, "no such workspace");
            return Ok(false);
        }
        self.active = name.to_string();
        self.save_config()?;
        Ok(true)
    }

    pub fn active_workspace_name(&self) -> &str {
        &self.active
    }

    pub fn get_active_workspace(&self) -> Option<&Workspace> {
        self.workspaces.get(&self.active)
    }

    pub fn get_active_workspace_mut(&mut self) -> Option<&mut Workspace> {
        self.workspaces.get_mut(&self.active)
    }

    pub fn get_workspace(&self, name: &str) -> Option<&Workspace> {
        self.workspaces.get(name)
    }

    pub fn get_workspace_mut(&mut self, name: &str) -> Option<&mut Workspace> {
        self.workspaces.get_mut(name)
    }

    pub fn get_workspace_names(&self) -> Vec<String> {
        self.workspaces.keys().cloned().collect()
    }
}

/// Extract the workspace name from a `.workspace_<name>.json` path.
pub(crate) fn workspace_name_from_path(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_string_lossy();
    let name = file_name
        .strip_prefix(".workspace_")?
        .strip_suffix(".json")?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
