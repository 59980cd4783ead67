pub mod envs;
pub mod events;
pub mod fs;
pub mod graph;
pub mod indexer;
pub mod models;
pub mod process;
pub mod project;
pub mod validation;
pub mod vault;
pub mod workspace;

/// Name of the application config directory under the user's home.
pub const APP_DIR_NAME: &str = ".computinator_code";
