//! Advisory file locking for configs shared across processes.
//!
//! The global vault registry (`vaults_config.json`) can be touched by more
//! than one running instance of the IDE plus the `compenv` helper, so reads
//! and writes go through `fs2` advisory locks. Locks are cooperative: every
//! writer of the registry file must use these functions.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Read a shared config file under a shared (read) lock.
///
/// Multiple readers may proceed concurrently; the call blocks while another
/// process holds the exclusive (write) lock.
pub fn locked_read(path: &Path) -> Result<String> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    file.lock_shared()
        .with_context(|| format!("Failed to lock {} for reading", path.display()))?;
    let mut content = String::new();
    BufReader::new(&file)
        .read_to_string(&mut content)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content)
}

/// Replace a shared config file's contents under an exclusive lock.
///
/// The file is truncated only after the lock is held, so a concurrent
/// `locked_read` never observes the empty window between truncate and write.
pub fn locked_write(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    #[allow(clippy::suspicious_open_options)]
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    file.lock_exclusive()
        .with_context(|| format!("Failed to lock {} for writing", path.display()))?;
    file.set_len(0)
        .with_context(|| format!("Failed to truncate {}", path.display()))?;
    let mut writer = BufWriter::new(&file);
    writer
        .write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_write_then_read() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("vaults_config.json");

        locked_write(&path, "{\"vaults\": {}}").unwrap();
        assert_eq!(locked_read(&path).unwrap(), "{\"vaults\": {}}");
    }

    #[test]
    fn test_write_replaces_previous_content() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("vaults_config.json");

        locked_write(&path, "a long first version of the file").unwrap();
        locked_write(&path, "short").unwrap();
        assert_eq!(locked_read(&path).unwrap(), "short");
    }

    #[test]
    fn test_concurrent_writers_leave_one_intact_version() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("registry.json");

        locked_write(&path, "seed").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                thread::spawn(move || {
                    locked_write(&path, &format!("writer {i} version")).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let content = locked_read(&path).unwrap();
        assert!(content.starts_with("writer "));
        assert!(content.ends_with(" version"));
    }
}
