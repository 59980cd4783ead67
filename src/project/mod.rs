//! Project registry: named projects with language, version, and
//! build/run commands.
//!
//! State persists to `projects_config.json` in the app-data dir. Older
//! installs stored projects as bare path strings; those are accepted on
//! read and rewritten in full object form on the next save.

pub mod build;

pub use build::{BuildError, BuildManager, BuildOutput};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::envs::EnvironmentManager;
use crate::fs::json::JsonDocument;
use crate::models::{Project, ProjectEntry};
use crate::process::ProcessRegistry;
use crate::validation::validate_name;

/// Most-recently-used list cap.
pub const MAX_RECENT_PROJECTS: usize = 10;

/// On-disk shape of `projects_config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProjectsFile {
    #[serde(default)]
    projects: BTreeMap<String, ProjectEntry>,
    #[serde(default)]
    current_project: Option<String>,
    #[serde(default)]
    recent_projects: Vec<String>,
}

impl JsonDocument for ProjectsFile {}

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("no such project '{0}'")]
    UnknownProject(String),
    #[error("project '{name}' points at a missing path: {path}")]
    MissingPath { name: String, path: PathBuf },
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// Registry of projects plus the current/recent pointers.
#[derive(Debug)]
pub struct ProjectManager {
    config_path: PathBuf,
    projects: BTreeMap<String, Project>,
    current: Option<String>,
    recents: Vec<String>,
    environments: EnvironmentManager,
    builds: BuildManager,
}

impl ProjectManager {
    /// Load the registry from `projects_config.json` under `app_dir`.
    ///
    /// Legacy string entries are normalized; entries with an empty path
    /// are dropped with a warning.
    pub fn with_app_dir(app_dir: &Path) -> Result<Self> {
        let config_path = app_dir.join("projects_config.json");
        let file = ProjectsFile::load(&config_path);

        let mut projects = BTreeMap::new();
        for (name, entry) in file.projects {
            if entry.path().is_none() {
                warn!(project = %name, "dropping project entry with empty path");
                continue;
            }
            projects.insert(name, entry.into_project());
        }

        let current = file
            .current_project
            .filter(|name| projects.contains_key(name));
        let recents = file
            .recent_projects
            .into_iter()
            .filter(|name| projects.contains_key(name))
            .collect();

        Ok(Self {
            config_path,
            projects,
            current,
            recents,
            environments: EnvironmentManager::in_app_dir(app_dir)?,
            builds: BuildManager::new(),
        })
    }

    pub fn environments(&self) -> &EnvironmentManager {
        &self.environments
    }

    pub fn environments_mut(&mut self) -> &mut EnvironmentManager {
        &mut self.environments
    }

    pub fn get_project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    /// Project names, sorted.
    pub fn project_names(&self) -> Vec<String> {
        self.projects.keys().cloned().collect()
    }

    pub fn current_project(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Most recent first.
    pub fn recent_projects(&self) -> &[String] {
        &self.recents
    }

    /// Register a project. Duplicate names are rejected; an environment
    /// handle is recorded for the project's language/version.
    pub fn add_project(&mut self, name: &str, project: Project) -> Result<()> {
        validate_name(name)?;
        if self.projects.contains_key(name) {
            bail!("project '{name}' already exists");
        }
        if !project.language.is_empty() {
            self.environments
                .ensure(name, &project.language, &project.version)?;
        }
        self.projects.insert(name.to_string(), project);
        self.save()?;
        info!(project = name, "added project");
        Ok(())
    }

    /// Remove a project. The current pointer and recents forget it.
    pub fn remove_project(&mut self, name: &str) -> Result<bool> {
        if self.projects.remove(name).is_none() {
            info!(project = name, "no such project");
            return Ok(false);
        }
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        self.recents.retain(|n| n != name);
        self.save()?;
        info!(project = name, "removed project");
        Ok(true)
    }

    /// Rename a project. The current pointer and the recents list follow
    /// the rename in place; recency order is untouched.
    pub fn rename_project(&mut self, old: &str, new: &str) -> Result<bool> {
        validate_name(new)?;
        if self.projects.contains_key(new) {
            bail!("project '{new}' already exists");
        }
        let Some(project) = self.projects.remove(old) else {
            info!(project = old, "no such project");
            return Ok(false);
        };
        self.projects.insert(new.to_string(), project);
        if self.current.as_deref() == Some(old) {
            self.current = Some(new.to_string());
        }
        for entry in &mut self.recents {
            if entry == old {
                *entry = new.to_string();
            }
        }
        self.save()?;
        info!(from = old, to = new, "renamed project");
        Ok(true)
    }

    /// Make a project current and promote it to the head of the recents
    /// list. Returns false for unknown names.
    pub fn set_current_project(&mut self, name: &str) -> Result<bool> {
        if !self.projects.contains_key(name) {
            info!(project = name, "no such project");
            return Ok(false);
        }
        self.current = Some(name.to_string());
        self.recents.retain(|n| n != name);
        self.recents.insert(0, name.to_string());
        self.recents.truncate(MAX_RECENT_PROJECTS);
        self.save()?;
        Ok(true)
    }

    /// Switch to a project, checking its directory still exists. Returns
    /// the project's path.
    pub fn switch_project(&mut self, name: &str) -> Result<PathBuf, SwitchError> {
        let project = self
            .projects
            .get(name)
            .ok_or_else(|| SwitchError::UnknownProject(name.to_string()))?;
        let path = PathBuf::from(&project.path);
        if !path.exists() {
            return Err(SwitchError::MissingPath {
                name: name.to_string(),
                path,
            });
        }
        self.set_current_project(name)?;
        Ok(path)
    }

    /// Run a project's build command to completion.
    pub fn build_project(&self, name: &str) -> Result<BuildOutput, BuildError> {
        let project = self
            .projects
            .get(name)
            .ok_or_else(|| BuildError::UnknownProject(name.to_string()))?;
        self.builds.build(name, project)
    }

    /// Launch a project's run command, tracked in `registry`.
    pub fn run_project(
        &self,
        name: &str,
        registry: &mut ProcessRegistry,
    ) -> Result<u32, BuildError> {
        let project = self
            .projects
            .get(name)
            .ok_or_else(|| BuildError::UnknownProject(name.to_string()))?;
        self.builds.run(name, project, registry)
    }

    fn save(&self) -> Result<()> {
        ProjectsFile {
            projects: self
                .projects
                .iter()
                .map(|(name, project)| (name.clone(), ProjectEntry::Full(project.clone())))
                .collect(),
            current_project: self.current.clone(),
            recent_projects: self.recents.clone(),
        }
        .save(&self.config_path)
    }
}
