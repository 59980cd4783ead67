//! Top-level vault registry: owns every vault, the current-vault pointer,
//! and the background indexing queue.
//!
//! Registry state persists to `<appdata>/vaults_config.json` under advisory
//! locks (other processes of the IDE may read it). The manager guarantees a
//! usable default vault at first start and keeps the current-vault pointer
//! valid whenever at least one vault exists.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::events::{Event, EventBus};
use crate::fs::json::to_pretty_string;
use crate::fs::locking::{locked_read, locked_write};
use crate::fs::paths::{app_data_dir, canonicalize_lenient, is_descendant};
use crate::validation::validate_name;
use crate::vault::queue::{IndexingQueue, ScanOutcome, DEFAULT_DRAIN_WINDOW};
use crate::vault::{AddProjectError, Vault};

/// Name given to the vault created on first start.
pub const DEFAULT_VAULT_NAME: &str = "Default Vault";

/// Directory (under the app-data dir) backing the default vault.
pub const DEFAULT_VAULT_DIR: &str = "default_vault";

/// Vaults whose name starts with this prefix are stale temporaries from a
/// crashed previous run and are cleaned up at startup.
pub const TEMP_VAULT_PREFIX: &str = "temp_vault";

/// On-disk shape of `vaults_config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RegistryConfig {
    #[serde(default)]
    vaults: BTreeMap<String, PathBuf>,
    #[serde(default)]
    default: Option<String>,
}

/// Registry of all vaults plus the async indexing queue.
pub struct VaultManager {
    app_dir: PathBuf,
    config_path: PathBuf,
    vaults: BTreeMap<String, Vault>,
    /// Registration order; drives deterministic current-vault fallback.
    order: Vec<String>,
    current: Option<String>,
    default: Option<String>,
    events: EventBus,
    queue: IndexingQueue,
}

impl VaultManager {
    /// Initialize against the user's app-data directory.
    pub fn new() -> Result<Self> {
        Self::with_app_dir(app_data_dir()?)
    }

    /// Initialize against an explicit app-data directory (tests use this).
    ///
    /// Loads the registry, cleans up `temp_vault*` leftovers, guarantees a
    /// default vault exists, and points `current` at the default.
    pub fn with_app_dir(app_dir: impl Into<PathBuf>) -> Result<Self> {
        let app_dir = app_dir.into();
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("Failed to create {}", app_dir.display()))?;

        let config_path = app_dir.join("vaults_config.json");
        let mut manager = Self {
            app_dir,
            config_path,
            vaults: BTreeMap::new(),
            order: Vec::new(),
            current: None,
            default: None,
            events: EventBus::new(),
            queue: IndexingQueue::start(),
        };

        let config = manager.read_registry();
        for (name, path) in config.vaults {
            if name.starts_with(TEMP_VAULT_PREFIX) {
                manager.cleanup_temp_vault(&name, &path);
                continue;
            }
            match Vault::new(name.clone(), &path) {
                Ok(mut vault) => {
                    vault.load_config();
                    vault.load_index();
                    manager.order.push(name.clone());
                    manager.vaults.insert(name, vault);
                }
                Err(err) => {
                    warn!(vault = %name, error = %err, "dropping unusable vault from registry");
                }
            }
        }

        manager.ensure_default_vault()?;

        manager.default = config
            .default
            .filter(|name| manager.vaults.contains_key(name))
            .or_else(|| manager.order.first().cloned());
        let initial = manager
            .default
            .clone()
            .or_else(|| manager.order.first().cloned());
        if let Some(name) = initial {
            manager.activate(&name)?;
        }
        manager.save_registry()?;
        Ok(manager)
    }

    /// The canonical event bus for the core.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Vault names in registration order.
    pub fn vault_names(&self) -> &[String] {
        &self.order
    }

    pub fn get_vault(&self, name: &str) -> Option<&Vault> {
        self.vaults.get(name)
    }

    pub fn get_vault_mut(&mut self, name: &str) -> Option<&mut Vault> {
        self.vaults.get_mut(name)
    }

    pub fn current_vault_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn default_vault_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn get_current_vault(&self) -> Option<&Vault> {
        self.current.as_deref().and_then(|name| self.vaults.get(name))
    }

    pub fn get_current_vault_mut(&mut self) -> Option<&mut Vault> {
        let name = self.current.clone()?;
        self.vaults.get_mut(&name)
    }

    /// Register a directory as a vault.
    ///
    /// A name collision is resolved by suffixing `_1`, `_2`, and so on;
    /// both vaults coexist even when they point at the same root. Returns
    /// the final (possibly suffixed) name.
    pub fn add_vault_directory(&mut self, name: &str, path: &Path) -> Result<String> {
        validate_name(name)?;
        let final_name = self.unique_name(name);
        let mut vault = Vault::new(final_name.clone(), path)?;
        vault.load_config();
        vault.save_config()?;
        vault.load_index();

        self.order.push(final_name.clone());
        self.vaults.insert(final_name.clone(), vault);
        self.save_registry()?;
        self.events.emit(&Event::VaultAdded(final_name.clone()));

        if self.current.is_none() {
            self.set_current_vault(&final_name)?;
        }
        Ok(final_name)
    }

    /// Remove a vault from the registry. The directory on disk is kept.
    ///
    /// Removing the current vault promotes the first remaining vault in
    /// registration order; when none remain a fresh default vault is
    /// created under the app-data dir.
    pub fn remove_vault(&mut self, name: &str) -> Result<bool> {
        if self.vaults.remove(name).is_none() {
            info!(vault = name, "no such vault");
            return Ok(false);
        }
        self.order.retain(|n| n != name);
        if self.default.as_deref() == Some(name) {
            self.default = self.order.first().cloned();
        }

        let was_current = self.current.as_deref() == Some(name);
        if was_current {
            self.current = None;
        }
        self.ensure_default_vault()?;
        // ensure_default_vault already repointed `current` when it had to
        // create a fresh vault.
        if was_current && self.current.is_none() {
            if let Some(next) = self.order.first().cloned() {
                self.set_current_vault(&next)?;
            }
        }

        self.save_registry()?;
        self.events.emit(&Event::VaultRemoved(name.to_string()));
        Ok(true)
    }

    /// Switch the current vault. Returns false for unknown names.
    ///
    /// The new current vault's config and persisted index are reloaded and
    /// its knowledge graph rebuilt; `vault_changed` fires immediately.
    /// Callers wanting a fresh filesystem scan queue one explicitly.
    pub fn set_current_vault(&mut self, name: &str) -> Result<bool> {
        if !self.vaults.contains_key(name) {
            info!(vault = name, "no such vault");
            return Ok(false);
        }
        self.activate(name)?;
        self.events.emit(&Event::VaultChanged(name.to_string()));
        Ok(true)
    }

    fn activate(&mut self, name: &str) -> Result<()> {
        if let Some(vault) = self.vaults.get_mut(name) {
            vault.load_config();
            vault.load_index();
            vault.update_knowledge_graph();
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Mark a vault as the startup default. Returns false for unknown names.
    pub fn set_default_vault(&mut self, name: &str) -> Result<bool> {
        if !self.vaults.contains_key(name) {
            info!(vault = name, "no such vault");
            return Ok(false);
        }
        self.default = Some(name.to_string());
        self.save_registry()?;
        Ok(true)
    }

    /// Add a project, creating a wrapper vault when needed.
    ///
    /// With `vault: Some(name)` the project is added to that vault; a path
    /// outside it falls through to wrapper creation. With `vault: None` the
    /// first registered vault containing the path hosts the project, and
    /// when no vault covers it a wrapper vault is created at the project's
    /// parent directory. Returns `(vault_name, relative_path)`.
    pub fn add_project(
        &mut self,
        vault: Option<&str>,
        project_name: &str,
        project_path: &Path,
    ) -> Result<(String, String)> {
        if let Some(vault_name) = vault {
            let vault_name = vault_name.to_string();
            let vault = self
                .vaults
                .get_mut(&vault_name)
                .with_context(|| format!("no such vault '{vault_name}'"))?;
            match vault.add_project(project_name, project_path) {
                Ok(rel) => {
                    self.events.emit(&Event::ProjectAdded {
                        vault: vault_name.clone(),
                        project: project_name.to_string(),
                    });
                    self.queue_vault_update(&vault_name);
                    return Ok((vault_name, rel));
                }
                Err(AddProjectError::OutsideVault { .. }) => {
                    // Fall through to wrapper-vault creation.
                }
                Err(err) => return Err(err.into()),
            }
        } else if let Some(host) = self
            .order
            .iter()
            .find(|name| {
                self.vaults
                    .get(*name)
                    .is_some_and(|v| is_descendant(v.root(), project_path))
            })
            .cloned()
        {
            let vault = self
                .vaults
                .get_mut(&host)
                .with_context(|| format!("no such vault '{host}'"))?;
            let rel = vault
                .add_project(project_name, project_path)
                .map_err(|err| anyhow::anyhow!(err))?;
            self.events.emit(&Event::ProjectAdded {
                vault: host.clone(),
                project: project_name.to_string(),
            });
            self.queue_vault_update(&host);
            return Ok((host, rel));
        }

        self.create_wrapper_vault_project(project_name, project_path)
    }

    /// Create (or reuse) a vault at the project's parent directory and add
    /// the project to it. The wrapper is named `<project>_vault`.
    pub fn create_wrapper_vault_project(
        &mut self,
        project_name: &str,
        project_path: &Path,
    ) -> Result<(String, String)> {
        let parent = project_path
            .parent()
            .with_context(|| format!("{} has no parent directory", project_path.display()))?
            .to_path_buf();

        let parent_canonical = canonicalize_lenient(&parent);
        let existing = self
            .order
            .iter()
            .find(|name| {
                self.vaults
                    .get(*name)
                    .is_some_and(|v| canonicalize_lenient(v.root()) == parent_canonical)
            })
            .cloned();

        let vault_name = match existing {
            Some(name) => name,
            None => self.add_vault_directory(&format!("{project_name}_vault"), &parent)?,
        };

        let vault = self
            .vaults
            .get_mut(&vault_name)
            .with_context(|| format!("no such vault '{vault_name}'"))?;
        let rel = vault
            .add_project(project_name, project_path)
            .map_err(|err| anyhow::anyhow!(err))?;
        self.events.emit(&Event::ProjectAdded {
            vault: vault_name.clone(),
            project: project_name.to_string(),
        });
        self.queue_vault_update(&vault_name);
        Ok((vault_name, rel))
    }

    /// Remove a project from a vault. Returns false when either is unknown.
    pub fn remove_project(&mut self, vault_name: &str, project_name: &str) -> Result<bool> {
        let Some(vault) = self.vaults.get_mut(vault_name) else {
            info!(vault = vault_name, "no such vault");
            return Ok(false);
        };
        if !vault.remove_project(project_name)? {
            return Ok(false);
        }
        self.events.emit(&Event::ProjectRemoved {
            vault: vault_name.to_string(),
            project: project_name.to_string(),
        });
        Ok(true)
    }

    /// Schedule a background re-scan of a vault. Returns false for unknown
    /// vaults and for requests that coalesced into an already-queued scan.
    pub fn queue_vault_update(&mut self, name: &str) -> bool {
        let Some(vault) = self.vaults.get(name) else {
            info!(vault = name, "no such vault");
            return false;
        };
        let scheduled = self.queue.enqueue(name, vault.root().to_path_buf());
        if scheduled {
            self.events.emit(&Event::IndexingStarted);
        }
        scheduled
    }

    /// Install every finished scan currently available. Returns how many
    /// were installed; emits `indexing_finished` for each.
    pub fn pump_indexing(&mut self) -> usize {
        let outcomes = self.queue.poll_outcomes();
        let count = outcomes.len();
        for outcome in outcomes {
            self.install_outcome(outcome);
        }
        count
    }

    /// Block for up to `timeout` for one finished scan and install it.
    pub fn wait_for_indexing(&mut self, timeout: Duration) -> bool {
        match self.queue.wait_outcome(timeout) {
            Some(outcome) => {
                self.install_outcome(outcome);
                true
            }
            None => false,
        }
    }

    fn install_outcome(&mut self, outcome: ScanOutcome) {
        let Some(vault) = self.vaults.get_mut(&outcome.vault) else {
            // Vault removed while its scan was in flight.
            info!(vault = %outcome.vault, "dropping scan result for removed vault");
            return;
        };
        vault.install_scan(outcome.index, outcome.graph);
        if let Err(err) = vault.save_index() {
            warn!(vault = %outcome.vault, error = %err, "failed to persist index");
        }
        if outcome.skipped > 0 {
            info!(vault = %outcome.vault, skipped = outcome.skipped, "scan skipped unreadable files");
        }
        self.events.emit(&Event::IndexingFinished);
    }

    /// Stop the indexing worker, giving queued scans a drain window.
    pub fn shutdown(&mut self) {
        self.queue.shutdown(DEFAULT_DRAIN_WINDOW);
    }

    fn ensure_default_vault(&mut self) -> Result<()> {
        if !self.vaults.is_empty() {
            return Ok(());
        }
        let root = self.app_dir.join(DEFAULT_VAULT_DIR);
        let name = self.add_vault_directory(DEFAULT_VAULT_NAME, &root)?;
        self.default = Some(name);
        self.save_registry()?;
        Ok(())
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.vaults.contains_key(name) {
            return name.to_string();
        }
        let mut counter = 1;
        loop {
            let candidate = format!("{name}_{counter}");
            if !self.vaults.contains_key(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    fn cleanup_temp_vault(&self, name: &str, path: &Path) {
        info!(vault = name, "removing stale temporary vault");
        // Only delete directories we own; a temp vault outside the app-data
        // dir is merely deregistered.
        if is_descendant(&self.app_dir, path) && path.exists() {
            if let Err(err) = fs::remove_dir_all(path) {
                warn!(vault = name, error = %err, "failed to delete temporary vault directory");
            }
        }
    }

    fn read_registry(&self) -> RegistryConfig {
        if !self.config_path.exists() {
            return RegistryConfig::default();
        }
        let content = match locked_read(&self.config_path) {
            Ok(content) => content,
            Err(err) => {
                warn!(error = %err, "could not read vault registry, starting empty");
                return RegistryConfig::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "invalid vault registry JSON, starting empty");
                RegistryConfig::default()
            }
        }
    }

    fn save_registry(&self) -> Result<()> {
        let config = RegistryConfig {
            vaults: self
                .vaults
                .iter()
                .map(|(name, vault)| (name.clone(), vault.root().to_path_buf()))
                .collect(),
            default: self.default.clone(),
        };
        let content = to_pretty_string(&config)?;
        locked_write(&self.config_path, &content)
    }
}

impl Drop for VaultManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
