//! CLI command handlers
//!
//! Handlers return the process exit code: 0 on success (including the
//! "no prompt" soft failure), 1 on error.

pub mod extract;
pub mod report;
