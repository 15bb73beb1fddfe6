//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Hakuna time tracking tools for AI agents.
///
/// Serves time entry, timer, catalog and reporting tools over JSON-RPC on
/// stdin/stdout.
#[derive(Debug, Parser)]
#[command(
    name = "hakuna-mcp",
    version,
    about,
    long_about = None,
    after_help = "Env:   HAKUNA_TOKEN=<token>\nDocs:  https://github.com/krautnerds/hakuna-mcp"
)]
pub struct Cli {
    /// Enable verbose output (logged to stderr).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve tools over stdio (the default).
    Serve,

    /// Print the tool catalog as JSON and exit.
    Tools,
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["hakuna-mcp"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["hakuna-mcp", "tools", "--verbose", "--config", "c.toml"])
            .unwrap();
        assert!(matches!(cli.command, Some(Commands::Tools)));
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }
}
