//! Workspace persistence tests
//!
//! Workspaces live as `.workspace_<name>.json` files inside the vault;
//! the manager re-reads them when a vault becomes active.

use std::fs;

use computinator::workspace::{WorkspaceManager, DEFAULT_WORKSPACE};

use super::helpers::*;

/// Full round trip: create a workspace, populate a fileset, then rebuild
/// the manager as a restart would and find everything back.
#[test]
fn test_workspace_state_survives_restart() {
    let (_temp_dir, manager) = fresh_manager();
    let root = manager.get_current_vault().unwrap().root().to_path_buf();

    {
        let mut workspaces = WorkspaceManager::new();
        workspaces.set_vault(&root).unwrap();
        workspaces.add_workspace("Research").unwrap();
        workspaces.set_active_workspace("Research").unwrap();

        let workspace = workspaces.get_active_workspace_mut().unwrap();
        workspace
            .add_fileset("sources", vec!["a.md".to_string(), "b.md".to_string()])
            .unwrap();
        workspace.set_active_fileset("sources").unwrap();
    }
    assert!(root.join(".workspace_Research.json").exists());

    let mut workspaces = WorkspaceManager::new();
    workspaces.set_vault(&root).unwrap();
    assert!(workspaces.set_active_workspace("Research").unwrap());
    let workspace = workspaces.get_active_workspace().unwrap();
    assert_eq!(workspace.get_active_files(), ["a.md", "b.md"]);
    assert_eq!(workspace.active_fileset.as_deref(), Some("sources"));
}

/// The Default workspace always exists and cannot be removed.
#[test]
fn test_default_workspace_protected() {
    let (_temp_dir, manager) = fresh_manager();
    let root = manager.get_current_vault().unwrap().root().to_path_buf();

    let mut workspaces = WorkspaceManager::new();
    workspaces.set_vault(&root).unwrap();
    assert_eq!(workspaces.get_workspace_names(), [DEFAULT_WORKSPACE]);
    assert!(!workspaces.remove_workspace(DEFAULT_WORKSPACE).unwrap());
    assert!(workspaces.get_workspace(DEFAULT_WORKSPACE).is_some());
}

/// Removing the active workspace falls back to Default and deletes its
/// file.
#[test]
fn test_removing_active_workspace_falls_back() {
    let (_temp_dir, manager) = fresh_manager();
    let root = manager.get_current_vault().unwrap().root().to_path_buf();

    let mut workspaces = WorkspaceManager::new();
    workspaces.set_vault(&root).unwrap();
    workspaces.add_workspace("Scratch").unwrap();
    workspaces.set_active_workspace("Scratch").unwrap();

    assert!(workspaces.remove_workspace("Scratch").unwrap());
    assert_eq!(workspaces.active_workspace_name(), DEFAULT_WORKSPACE);
    assert!(!root.join(".workspace_Scratch.json").exists());
}

/// A stale active pointer in workspace_config.json falls back to Default.
#[test]
fn test_stale_active_pointer_falls_back() {
    let (_temp_dir, manager) = fresh_manager();
    let root = manager.get_current_vault().unwrap().root().to_path_buf();
    fs::write(
        root.join("workspace_config.json"),
        r#"{
    "default_workspace": "Default",
    "active_workspace": "Deleted Long Ago"
}"#,
    )
    .unwrap();

    let mut workspaces = WorkspaceManager::new();
    workspaces.set_vault(&root).unwrap();
    assert_eq!(workspaces.active_workspace_name(), DEFAULT_WORKSPACE);
}

/// Layouts and dock visibility round-trip as opaque JSON.
#[test]
fn test_layout_round_trip() {
    let (_temp_dir, manager) = fresh_manager();
    let root = manager.get_current_vault().unwrap().root().to_path_buf();

    let layout = serde_json::json!({
        "split": "vertical",
        "panes": [{"file": "a.md"}, {"file": "b.md"}]
    });
    {
        let mut workspaces = WorkspaceManager::new();
        workspaces.set_vault(&root).unwrap();
        let workspace = workspaces.get_active_workspace_mut().unwrap();
        workspace
            .set_layout(layout.clone(), vec!["outline".to_string()])
            .unwrap();
    }

    let mut workspaces = WorkspaceManager::new();
    workspaces.set_vault(&root).unwrap();
    let (stored, docks) = workspaces.get_active_workspace().unwrap().get_layout();
    assert_eq!(stored, Some(&layout));
    assert_eq!(docks, ["outline"]);
}
