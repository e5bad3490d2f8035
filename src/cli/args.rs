//! CLI argument definitions using clap
//!
//! Commands:
//! - aethra-planner plan --database <dir> --query <file> [--config <path>]
//! - aethra-planner schema --database <dir> [--config <path>]
//! - aethra-planner session [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Embeddable SQL planner for Arrow-backed AethraDB databases
#[derive(Parser, Debug)]
#[command(name = "aethra-planner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan one query and print the encoded plan
    Plan {
        /// Directory of Arrow IPC files, one per table
        #[arg(long)]
        database: PathBuf,

        /// File holding the SQL query
        #[arg(long)]
        query: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the catalog of a database directory
    Schema {
        /// Directory of Arrow IPC files, one per table
        #[arg(long)]
        database: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Read JSON plan requests from stdin, one per line, until EOF
    Session {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from([
            "aethra-planner",
            "plan",
            "--database",
            "/data/tpch",
            "--query",
            "q1.sql",
        ])
        .unwrap();

        match cli.command {
            Command::Plan {
                database,
                query,
                config,
            } => {
                assert_eq!(database, PathBuf::from("/data/tpch"));
                assert_eq!(query, PathBuf::from("q1.sql"));
                assert!(config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_plan_requires_query() {
        assert!(Cli::try_parse_from(["aethra-planner", "plan", "--database", "/db"]).is_err());
    }

    #[test]
    fn test_parse_session_with_config() {
        let cli =
            Cli::try_parse_from(["aethra-planner", "session", "--config", "planner.json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Session { config: Some(_) }
        ));
    }
}
