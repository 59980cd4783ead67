//! Vault registry lifecycle tests
//!
//! Fresh-start defaults, wrapper vaults for projects outside every vault,
//! and registry persistence across restarts.

use std::fs;

use computinator::vault::manager::{VaultManager, DEFAULT_VAULT_NAME};

use super::helpers::*;

/// Fresh start: a usable default vault exists and is current, and the
/// registry file records it.
#[test]
fn test_fresh_start_yields_default_vault() {
    let (temp_dir, manager) = fresh_manager();

    assert_eq!(manager.current_vault_name(), Some(DEFAULT_VAULT_NAME));
    let vault = manager.get_current_vault().expect("default vault missing");
    assert!(vault.root().is_dir());
    assert!(vault.config_path().exists());

    let registry = temp_dir.path().join("appdata").join("vaults_config.json");
    let content = fs::read_to_string(registry).expect("registry not written");
    assert!(content.contains(DEFAULT_VAULT_NAME));
}

/// Adding a project at a path no vault covers creates a wrapper vault at
/// the project's parent and registers the project inside it.
#[test]
fn test_project_outside_all_vaults_gets_wrapper() {
    let (temp_dir, mut manager) = fresh_manager();
    let project = temp_dir.path().join("repos").join("webapp");
    fs::create_dir_all(&project).unwrap();

    let (vault_name, rel) = manager
        .add_project(None, "webapp", &project)
        .expect("wrapper vault creation failed");

    assert_eq!(vault_name, "webapp_vault");
    assert_eq!(rel, "webapp");
    let vault = manager.get_vault("webapp_vault").unwrap();
    assert_eq!(vault.root(), temp_dir.path().join("repos"));
    assert_eq!(vault.get_project("webapp"), Some("webapp"));
    // Resolved paths are always absolute.
    assert_eq!(vault.get_project_path("webapp"), Some(project));
}

/// A second foreign project under the same parent reuses the wrapper.
#[test]
fn test_sibling_project_reuses_wrapper_vault() {
    let (temp_dir, mut manager) = fresh_manager();
    let repos = temp_dir.path().join("repos");
    fs::create_dir_all(repos.join("one")).unwrap();
    fs::create_dir_all(repos.join("two")).unwrap();

    let (first, _) = manager.add_project(None, "one", &repos.join("one")).unwrap();
    let (second, _) = manager.add_project(None, "two", &repos.join("two")).unwrap();

    assert_eq!(first, second);
    let vault = manager.get_vault(&first).unwrap();
    assert_eq!(vault.get_project_names(), ["one", "two"]);
}

/// The registry round-trips across a restart, including the default
/// pointer and vault name suffixing.
#[test]
fn test_registry_round_trip_with_suffixed_names() {
    let (temp_dir, _keep) = {
        let (temp_dir, mut manager) = fresh_manager();
        let root = temp_dir.path().join("notes");
        assert_eq!(manager.add_vault_directory("Notes", &root).unwrap(), "Notes");
        assert_eq!(
            manager.add_vault_directory("Notes", &root).unwrap(),
            "Notes_1"
        );
        manager.set_default_vault("Notes_1").unwrap();
        (temp_dir, ())
    };

    let manager = VaultManager::with_app_dir(temp_dir.path().join("appdata")).unwrap();
    let names = manager.vault_names();
    assert!(names.contains(&"Notes".to_string()));
    assert!(names.contains(&"Notes_1".to_string()));
    assert_eq!(manager.default_vault_name(), Some("Notes_1"));
}

/// Vault lifecycle events fire in order on the UI-side bus.
#[test]
fn test_vault_events_fire_in_order() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let (temp_dir, mut manager) = fresh_manager();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    manager
        .events_mut()
        .subscribe(move |event| sink.borrow_mut().push(event.to_string()));

    let root = temp_dir.path().join("second");
    manager.add_vault_directory("Second", &root).unwrap();
    manager.set_current_vault("Second").unwrap();
    manager.remove_vault("Second").unwrap();

    let seen = seen.borrow();
    let position = |needle: &str| {
        seen.iter()
            .position(|e| e == needle)
            .unwrap_or_else(|| panic!("missing event {needle} in {seen:?}"))
    };
    assert!(position("vault_added(Second)") < position("vault_changed(Second)"));
    assert!(position("vault_changed(Second)") < position("vault_removed(Second)"));
    assert_eq!(manager.current_vault_name(), Some(DEFAULT_VAULT_NAME));
}
