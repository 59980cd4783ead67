//! Path helpers: the app-data directory and vault containment checks.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::APP_DIR_NAME;

/// Resolve the application data directory (`~/.computinator_code`).
///
/// The directory is created on first use.
pub fn app_data_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine the user's home directory")?;
    let dir = home.join(APP_DIR_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create app data directory {}", dir.display()))?;
    Ok(dir)
}

/// Canonicalize a path, tolerating a non-existent leaf.
///
/// The deepest existing ancestor is canonicalized and the remaining
/// components are re-appended, so containment checks work for paths that
/// have not been created yet.
pub fn canonicalize_lenient(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    let mut tail = Vec::new();
    let mut cursor = path;
    while let Some(parent) = cursor.parent() {
        if let Some(name) = cursor.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(resolved) = parent.canonicalize() {
            let mut result = resolved;
            for component in tail.iter().rev() {
                result.push(component);
            }
            return result;
        }
        cursor = parent;
    }
    path.to_path_buf()
}

/// True when `child` is `root` or lives underneath it.
///
/// Both sides are canonicalized first. Paths that cannot be compared (for
/// example different drives on Windows) report `false` rather than erroring.
pub fn is_descendant(root: &Path, child: &Path) -> bool {
    let root = canonicalize_lenient(root);
    let child = canonicalize_lenient(child);
    child.starts_with(&root)
}

/// Compute `child`'s path relative to `root` as a forward-slash string.
///
/// Fails when `child` is not contained in `root`.
pub fn relative_to_root(root: &Path, child: &Path) -> Result<String> {
    let root = canonicalize_lenient(root);
    let child = canonicalize_lenient(child);
    let Ok(rel) = child.strip_prefix(&root) else {
        bail!(
            "{} is not inside {}",
            child.display(),
            root.display()
        );
    };
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
