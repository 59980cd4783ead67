//! Shared test helpers for core integration tests

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use computinator::vault::VaultManager;

/// Test helper: a VaultManager rooted in a fresh temp app-data dir.
pub fn fresh_manager() -> (TempDir, VaultManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let manager = VaultManager::with_app_dir(temp_dir.path().join("appdata"))
        .expect("Failed to initialize vault manager");
    (temp_dir, manager)
}

/// Test helper: write a note inside a vault root, creating parents.
pub fn write_note(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create note parent");
    }
    fs::write(&path, content).expect("Failed to write note");
    path
}

/// Test helper: block until `count` scans have been installed.
pub fn drain_indexing(manager: &mut VaultManager, count: usize) {
    for _ in 0..count {
        assert!(
            manager.wait_for_indexing(Duration::from_secs(10)),
            "timed out waiting for an indexing pass"
        );
    }
}
