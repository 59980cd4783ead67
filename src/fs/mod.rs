pub mod json;
pub mod locking;
pub mod paths;

// Re-export the pieces nearly every consumer wants.
pub use json::{read_json_or_default, write_json_pretty, JsonDocument};
pub use locking::{locked_read, locked_write};
pub use paths::{app_data_dir, is_descendant, relative_to_root};
