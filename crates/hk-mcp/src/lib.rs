//! Hakuna tool server library.
//!
//! This crate provides the CLI, configuration and stdio JSON-RPC server that
//! expose the Hakuna API client as tools.

mod cli;
mod config;
pub mod server;
pub mod tools;

pub use cli::{Cli, Commands};
pub use config::{Config, dirs_config_path};
pub use server::ToolServer;
pub use tools::{TOOLS, ToolError, ToolSpec};
