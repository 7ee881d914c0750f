//! CLI subcommand implementations.

pub mod append;
pub mod log;
pub mod stats;
pub mod verify;
