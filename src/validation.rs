//! Name validation for vaults, workspaces, and projects.
//!
//! Names end up in file paths (`.workspace_<name>.json`, vault directories,
//! environment trees), so they are validated before any path is built from
//! them.

use anyhow::{bail, Result};

/// Maximum allowed length for vault, workspace, and project names.
pub const MAX_NAME_LENGTH: usize = 50;

/// Validates a vault, workspace, or project name.
///
/// A name is valid if it is non-empty, at most [`MAX_NAME_LENGTH`]
/// characters, and contains only alphanumerics, underscores, dashes, and
/// spaces. The character set excludes `.` and path separators, so a valid
/// name can never navigate outside its parent directory.
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Name cannot be empty");
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        bail!(
            "Name too long: {} characters (max {MAX_NAME_LENGTH})",
            name.chars().count()
        );
    }

    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ' ');
    if !valid_chars {
        bail!("Name '{name}' contains invalid characters. Use only alphanumeric characters, dashes (-), underscores (_), and spaces");
    }

    Ok(())
}

/// Clap value parser for validating name arguments at parse time.
pub fn clap_name_validator(s: &str) -> Result<String, String> {
    validate_name(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}
