//! Integration tests for the Computinator Code core
//!
//! These tests drive the whole stack the way the desktop shell does:
//! vault registry, background indexing, workspaces, and the project
//! registry, all against real temp directories.

pub mod helpers;
pub mod indexing_flow;
pub mod project_flow;
pub mod vault_flow;
pub mod workspace_flow;
