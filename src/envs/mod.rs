//! Language environments: per-project toolchain directories.
//!
//! Environments live under `<appdata>/environments/<name>/` and are
//! recorded in `environments.json` next to the tree. Adding a project
//! registers an environment for its language/version; the `compenv`
//! binary manages them from the command line.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::fs::json::JsonDocument;
use crate::validation::validate_name;

/// One recorded environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub language: String,
    pub version: String,
    pub path: PathBuf,
    pub created: DateTime<Utc>,
}

/// On-disk shape of `environments.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct EnvironmentsFile {
    #[serde(default)]
    environments: BTreeMap<String, Environment>,
}

impl JsonDocument for EnvironmentsFile {}

/// Manages the environment tree and its record file.
#[derive(Debug)]
pub struct EnvironmentManager {
    root: PathBuf,
    config_path: PathBuf,
    environments: BTreeMap<String, Environment>,
}

impl EnvironmentManager {
    /// Open (or initialize) the environment tree under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create {}", root.display()))?;
        let config_path = root.join("environments.json");
        let file = EnvironmentsFile::load(&config_path);
        Ok(Self {
            root,
            config_path,
            environments: file.environments,
        })
    }

    /// Environment tree rooted under an app-data directory.
    pub fn in_app_dir(app_dir: &Path) -> Result<Self> {
        Self::new(app_dir.join("environments"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create an environment directory and record it. Duplicate names are
    /// rejected.
    pub fn create(&mut self, name: &str, language: &str, version: &str) -> Result<&Environment> {
        validate_name(name)?;
        if self.environments.contains_key(name) {
            bail!("environment '{name}' already exists");
        }
        let path = self.root.join(name);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let environment = Environment {
            language: language.to_string(),
            version: version.to_string(),
            path,
            created: Utc::now(),
        };
        self.environments.insert(name.to_string(), environment);
        self.save()?;
        info!(environment = name, language, version, "created environment");
        Ok(&self.environments[name])
    }

    /// Record an environment for a project, reusing one that already
    /// exists under the same name.
    pub fn ensure(&mut self, name: &str, language: &str, version: &str) -> Result<()> {
        if self.environments.contains_key(name) {
            return Ok(());
        }
        self.create(name, language, version)?;
        Ok(())
    }

    /// Delete an environment's directory and record. Returns false for
    /// unknown names.
    pub fn delete(&mut self, name: &str) -> Result<bool> {
        let Some(environment) = self.environments.remove(name) else {
            info!(environment = name, "no such environment");
            return Ok(false);
        };
        if environment.path.exists() {
            fs::remove_dir_all(&environment.path)
                .with_context(|| format!("Failed to delete {}", environment.path.display()))?;
        }
        self.save()?;
        info!(environment = name, "deleted environment");
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<&Environment> {
        self.environments.get(name)
    }

    /// All environments, sorted by name.
    pub fn list(&self) -> Vec<(&str, &Environment)> {
        self.environments
            .iter()
            .map(|(name, environment)| (name.as_str(), environment))
            .collect()
    }

    fn save(&self) -> Result<()> {
        EnvironmentsFile {
            environments: self.environments.clone(),
        }
        .save(&self.config_path)
    }
}
