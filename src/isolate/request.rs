//! Plan requests and responses

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::planner::{PlannerError, PlannerResult};

use super::errors::{IsolateError, IsolateResult};

/// Where the SQL text of a request comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    /// A file holding the query
    Path(PathBuf),
    /// The query itself
    Text(String),
}

/// A request to plan one query against one Arrow database directory
///
/// In JSON:
///
/// ```json
/// {"database": "/data/tpch", "query": {"path": "/queries/q3.sql"}}
/// {"database": "/data/tpch", "query": {"text": "SELECT ..."}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub database: PathBuf,
    pub query: QuerySource,
}

impl PlanRequest {
    /// Request for a query stored in a file
    pub fn from_paths(database: impl Into<PathBuf>, query_path: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            query: QuerySource::Path(query_path.into()),
        }
    }

    /// Request for inline SQL text
    pub fn from_text(database: impl Into<PathBuf>, sql: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            query: QuerySource::Text(sql.into()),
        }
    }

    /// Checks the request shape before any work is done
    pub fn validate(&self) -> IsolateResult<()> {
        if self.database.as_os_str().is_empty() {
            return Err(IsolateError::InvalidRequest(
                "database path is empty".into(),
            ));
        }

        match &self.query {
            QuerySource::Path(path) if path.as_os_str().is_empty() => Err(
                IsolateError::InvalidRequest("query path is empty".into()),
            ),
            QuerySource::Text(sql) if sql.trim().is_empty() => Err(
                IsolateError::InvalidRequest("query text is blank".into()),
            ),
            _ => Ok(()),
        }
    }

    /// The SQL text of the request
    pub fn read_query(&self) -> PlannerResult<String> {
        match &self.query {
            QuerySource::Text(sql) => Ok(sql.clone()),
            QuerySource::Path(path) => read_query_file(path),
        }
    }
}

fn read_query_file(path: &Path) -> PlannerResult<String> {
    fs::read_to_string(path).map_err(|e| PlannerError::io(path.display(), e))
}

/// The result of a successful plan request. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanResponse {
    /// Optimised plan in the Aethra Engine Plan Format
    pub plan: String,
    /// Explain tree of the optimised plan
    pub explain: String,
    /// Tables the plan reads, sorted
    pub tables: Vec<String>,
}

impl PlanResponse {
    /// Number of operators in the encoded plan
    pub fn operator_count(&self) -> usize {
        self.plan.lines().count()
    }
}
