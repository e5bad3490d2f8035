//! CLI module for aethra-planner
//!
//! Provides command-line interface for:
//! - plan: One-shot planning of a query file
//! - schema: Catalog of a database directory
//! - session: Line-oriented JSON plan requests on one isolate

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{load_config, plan, run, run_command, run_session, schema, session};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_requests, write_error, write_response, SessionLine};
