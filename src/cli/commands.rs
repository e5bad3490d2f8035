//! CLI command implementations
//!
//! Every command loads configuration first, then works through an
//! [`IsolateRegistry`] exactly like an embedding caller would.

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::isolate::{IsolateError, IsolateGuard, IsolateRegistry, PlanRequest, PlanResponse};
use crate::observability::{log_event_with_fields, Event, Logger};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_requests, write_error, write_response, SessionLine};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Plan {
            database,
            query,
            config,
        } => plan(config.as_deref(), &database, &query),
        Command::Schema { database, config } => schema(config.as_deref(), &database),
        Command::Session { config } => session(config.as_deref()),
    }
}

/// Loads configuration (defaults without a path) and applies the log level
pub fn load_config(path: Option<&Path>) -> CliResult<PlannerConfig> {
    let config = match path {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };

    Logger::set_min_severity(config.log_severity());
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("max_isolates", &config.max_isolates.to_string()),
            ("log_level", &config.log_level),
        ],
    );

    Ok(config)
}

/// Plan one query and print the response
pub fn plan(config_path: Option<&Path>, database: &Path, query: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let registry = IsolateRegistry::new(config);
    let guard = registry.scoped().map_err(|e| CliError::isolate_unavailable(e.to_string()))?;

    let request = PlanRequest::from_paths(database, query);
    let mut stdout = io::stdout();
    write_plan_result(&mut stdout, guard.plan(&request))?;

    guard
        .release()
        .map_err(|e| CliError::isolate_unavailable(e.to_string()))
}

/// Print the catalog of a database directory
pub fn schema(config_path: Option<&Path>, database: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let mut stdout = io::stdout();

    match Catalog::from_directory(database, config.case_sensitive) {
        Ok(catalog) => write_response(&mut stdout, serde_json::to_value(&catalog)?),
        Err(e) => write_error(&mut stdout, e.code().code(), e.message()),
    }
}

/// Serve plan requests from stdin on one isolate until EOF
pub fn session(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let registry = IsolateRegistry::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_session(&registry, stdin.lock(), &mut stdout)
}

/// The session loop over any reader and writer.
///
/// One response line is written per request line. A malformed line gets an
/// error response and the session continues.
pub fn run_session<R: BufRead, W: Write>(
    registry: &IsolateRegistry,
    reader: R,
    writer: &mut W,
) -> CliResult<()> {
    let guard: IsolateGuard<'_> = registry
        .scoped()
        .map_err(|e| CliError::isolate_unavailable(e.to_string()))?;

    let isolate = guard.handle().to_string();
    log_event_with_fields(Event::SessionStart, &[("isolate", &isolate)]);

    let mut served = 0u64;
    for line in read_requests(reader) {
        match line? {
            SessionLine::Request(value) => match parse_request(value) {
                Ok(request) => write_plan_result(writer, guard.plan(&request))?,
                Err(e) => write_error(writer, e.code_str(), e.message())?,
            },
            SessionLine::Malformed(reason) => {
                let e = CliError::invalid_request(format!("Invalid JSON: {}", reason));
                write_error(writer, e.code_str(), e.message())?;
            }
        }
        served += 1;
    }

    log_event_with_fields(
        Event::SessionEnd,
        &[("isolate", &isolate), ("requests", &served.to_string())],
    );
    Logger::info("SESSION_METRICS", &[("metrics", &registry.metrics().to_json())]);

    guard
        .release()
        .map_err(|e| CliError::isolate_unavailable(e.to_string()))
}

fn parse_request(value: Value) -> CliResult<PlanRequest> {
    serde_json::from_value(value).map_err(|e| CliError::invalid_request(e.to_string()))
}

fn write_plan_result<W: Write>(
    writer: &mut W,
    result: Result<PlanResponse, IsolateError>,
) -> CliResult<()> {
    match result {
        Ok(response) => write_response(
            writer,
            json!({
                "plan": response.plan,
                "explain": response.explain,
                "tables": response.tables,
            }),
        ),
        Err(e) => write_error(writer, e.code(), &e.message()),
    }
}
