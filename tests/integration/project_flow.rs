//! Project registry flow tests
//!
//! Rename bookkeeping, switching, and build/run execution against real
//! directories and processes.

use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use computinator::models::Project;
use computinator::process::ProcessRegistry;
use computinator::project::{BuildError, ProjectManager, SwitchError};

fn manager_with_app_dir() -> (TempDir, ProjectManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let app_dir = temp_dir.path().join("appdata");
    fs::create_dir_all(&app_dir).expect("Failed to create app dir");
    let manager = ProjectManager::with_app_dir(&app_dir).expect("Failed to open project manager");
    (temp_dir, manager)
}

fn simple_project(dir: &std::path::Path) -> Project {
    Project::new(dir.to_string_lossy().into_owned(), "python", "3.11")
}

/// Renaming a project keeps the current pointer and the recents slot;
/// the new name occupies the old position.
#[test]
fn test_rename_keeps_recents_position() {
    let (temp_dir, mut manager) = manager_with_app_dir();
    for name in ["alpha", "beta", "gamma"] {
        let dir = temp_dir.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        manager.add_project(name, simple_project(&dir)).unwrap();
        manager.set_current_project(name).unwrap();
    }
    assert_eq!(manager.recent_projects(), ["gamma", "beta", "alpha"]);

    assert!(manager.rename_project("beta", "delta").unwrap());
    assert_eq!(manager.recent_projects(), ["gamma", "delta", "alpha"]);
    assert_eq!(manager.current_project(), Some("gamma"));
    assert!(manager.get_project("delta").is_some());
}

/// Adding a project registers an environment handle for its language.
#[test]
fn test_add_project_registers_environment() {
    let (temp_dir, mut manager) = manager_with_app_dir();
    let dir = temp_dir.path().join("svc");
    fs::create_dir_all(&dir).unwrap();

    manager.add_project("svc", simple_project(&dir)).unwrap();
    let environment = manager.environments().get("svc").expect("no environment");
    assert_eq!(environment.language, "python");
    assert!(environment.path.is_dir());
}

/// Switching validates that the project directory still exists.
#[test]
fn test_switch_rejects_vanished_directory() {
    let (temp_dir, mut manager) = manager_with_app_dir();
    let dir = temp_dir.path().join("ephemeral");
    fs::create_dir_all(&dir).unwrap();
    manager.add_project("ephemeral", simple_project(&dir)).unwrap();

    fs::remove_dir_all(&dir).unwrap();
    assert!(matches!(
        manager.switch_project("ephemeral"),
        Err(SwitchError::MissingPath { .. })
    ));
    // The project stays registered; only the switch is refused.
    assert!(manager.get_project("ephemeral").is_some());
}

/// A failing build surfaces the tool's stderr verbatim.
#[test]
fn test_build_failure_surfaces_stderr() {
    let (temp_dir, mut manager) = manager_with_app_dir();
    let dir = temp_dir.path().join("broken");
    fs::create_dir_all(&dir).unwrap();
    let mut project = simple_project(&dir);
    project.build_command = Some("sh -c 'echo compile error: line 3 >&2; exit 1'".to_string());
    manager.add_project("broken", project).unwrap();

    match manager.build_project("broken") {
        Err(BuildError::Failed { status, stderr }) => {
            assert_eq!(status, 1);
            assert!(stderr.contains("compile error: line 3"));
        }
        other => panic!("expected build failure, got {other:?}"),
    }
}

/// Running a project tracks the child in the registry until terminated.
#[test]
fn test_run_project_tracked_and_terminated() {
    let (temp_dir, mut manager) = manager_with_app_dir();
    let dir = temp_dir.path().join("daemonish");
    fs::create_dir_all(&dir).unwrap();
    let mut project = simple_project(&dir);
    project.run_command = Some("sleep 60".to_string());
    manager.add_project("daemonish", project).unwrap();

    let mut registry = ProcessRegistry::new();
    let pid = manager.run_project("daemonish", &mut registry).unwrap();
    assert!(computinator::process::is_process_alive(pid));

    assert!(registry
        .terminate("daemonish", Duration::from_secs(2))
        .unwrap());
    assert!(!registry.contains("daemonish"));
}
