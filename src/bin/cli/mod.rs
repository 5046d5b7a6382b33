//! CLI Module Organization
//!
//! - args: CLI argument structures and shortcut-flag parsing
//! - commands: command execution
//! - output: report and configuration display

pub mod args;
pub mod commands;
pub mod output;

// Re-export commonly used items for convenience
pub use args::*;
pub use commands::*;
