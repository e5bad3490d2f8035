//! JSON I/O handling for CLI
//!
//! - Requests: one JSON object per line
//! - Responses: one JSON object per line, `{"status":"ok","data":..}` or
//!   `{"status":"error","code":..,"message":..}`
//! - UTF-8 only

use std::io::{BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// One line read from a session
pub enum SessionLine {
    Request(Value),
    /// Text that is not valid JSON; the session answers it with an error
    Malformed(String),
}

/// Reads JSON requests line by line, skipping blank lines.
///
/// Read failures end the iteration with an error.
pub fn read_requests<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<SessionLine>> {
    reader.lines().filter_map(|line| match line {
        Err(e) => Some(Err(CliError::from(e))),
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(match serde_json::from_str(&line) {
            Ok(value) => SessionLine::Request(value),
            Err(e) => SessionLine::Malformed(e.to_string()),
        })),
    })
}

/// Write a success response
pub fn write_response<W: Write>(writer: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(writer, &response)
}

/// Write an error response
pub fn write_error<W: Write>(writer: &mut W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(writer, &response)
}

fn write_line<W: Write>(writer: &mut W, response: &Value) -> CliResult<()> {
    serde_json::to_writer(&mut *writer, response)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
