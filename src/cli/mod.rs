use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "ActivityTracker",
    about = "Local calendar for habits and personal metrics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the server and open the calendar in the browser
    Start,
    /// Start the server without opening the browser
    Serve,
    /// Export all log entries to a JSON file
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show data paths, lock state and row counts
    Status,
    /// Read or change saved settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Set a config value
    Set { key: String, value: String },
    /// Print a config value
    Get { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn every_subcommand_has_help_text() {
        let command = Cli::command();
        command.clone().debug_assert();

        for sub in command.get_subcommands() {
            assert!(sub.get_about().is_some(), "missing help for {}", sub.get_name());
            for nested in sub.get_subcommands() {
                assert!(nested.get_about().is_some(), "missing help for {}", nested.get_name());
            }
        }
    }

    #[test]
    fn no_subcommand_parses_to_default_start() {
        let cli = Cli::try_parse_from(["ActivityTracker"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from(["ActivityTracker", "config", "get", "api.port"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config { command: ConfigCommands::Get { ref key } }) if key == "api.port"
        ));
    }
}
