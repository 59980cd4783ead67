pub mod file_info;
pub mod project;

pub use file_info::{FileInfo, FileKind, VaultIndex};
pub use project::{Project, ProjectEntry};
