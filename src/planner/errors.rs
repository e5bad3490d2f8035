//! Planner error types
//!
//! Error codes:
//! - AETHRA_QUERY_PARSE (REJECT)
//! - AETHRA_QUERY_INVALID (REJECT)
//! - AETHRA_QUERY_UNKNOWN_TABLE (REJECT)
//! - AETHRA_QUERY_UNKNOWN_COLUMN (REJECT)
//! - AETHRA_QUERY_AMBIGUOUS_COLUMN (REJECT)
//! - AETHRA_QUERY_TYPE_MISMATCH (REJECT)
//! - AETHRA_QUERY_NOT_GROUPED (REJECT)
//! - AETHRA_QUERY_UNSUPPORTED (REJECT)
//! - AETHRA_QUERY_IO (ERROR)

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected; the isolate stays usable
    Reject,
    /// The request could not be read
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Planner-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// SQL text failed to parse
    AethraQueryParse,
    /// Structurally invalid query (not a single SELECT, nested aggregate, ...)
    AethraQueryInvalid,
    /// Table not present in the catalog
    AethraQueryUnknownTable,
    /// Column not present in any table in scope
    AethraQueryUnknownColumn,
    /// Unqualified column present in more than one table in scope
    AethraQueryAmbiguousColumn,
    /// Operand types do not fit the operator
    AethraQueryTypeMismatch,
    /// Select or having expression neither grouped nor aggregated
    AethraQueryNotGrouped,
    /// Valid SQL that the engine plan format cannot express
    AethraQueryUnsupported,
    /// Query file could not be read
    AethraQueryIo,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::AethraQueryParse => "AETHRA_QUERY_PARSE",
            PlannerErrorCode::AethraQueryInvalid => "AETHRA_QUERY_INVALID",
            PlannerErrorCode::AethraQueryUnknownTable => "AETHRA_QUERY_UNKNOWN_TABLE",
            PlannerErrorCode::AethraQueryUnknownColumn => "AETHRA_QUERY_UNKNOWN_COLUMN",
            PlannerErrorCode::AethraQueryAmbiguousColumn => "AETHRA_QUERY_AMBIGUOUS_COLUMN",
            PlannerErrorCode::AethraQueryTypeMismatch => "AETHRA_QUERY_TYPE_MISMATCH",
            PlannerErrorCode::AethraQueryNotGrouped => "AETHRA_QUERY_NOT_GROUPED",
            PlannerErrorCode::AethraQueryUnsupported => "AETHRA_QUERY_UNSUPPORTED",
            PlannerErrorCode::AethraQueryIo => "AETHRA_QUERY_IO",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            PlannerErrorCode::AethraQueryIo => Severity::Error,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    code: PlannerErrorCode,
    message: String,
    /// Table or column name if applicable
    object: Option<String>,
}

impl PlannerError {
    fn new(code: PlannerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            object: None,
        }
    }

    pub fn parse(reason: impl fmt::Display) -> Self {
        Self::new(
            PlannerErrorCode::AethraQueryParse,
            format!("Failed to parse query: {}", reason),
        )
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::AethraQueryInvalid, reason)
    }

    pub fn unknown_table(table: impl Into<String>) -> Self {
        let t = table.into();
        Self {
            code: PlannerErrorCode::AethraQueryUnknownTable,
            message: format!("Object '{}' not found", t),
            object: Some(t),
        }
    }

    pub fn unknown_column(column: impl Into<String>) -> Self {
        let c = column.into();
        Self {
            code: PlannerErrorCode::AethraQueryUnknownColumn,
            message: format!("Column '{}' not found in any table", c),
            object: Some(c),
        }
    }

    pub fn ambiguous_column(column: impl Into<String>) -> Self {
        let c = column.into();
        Self {
            code: PlannerErrorCode::AethraQueryAmbiguousColumn,
            message: format!("Column '{}' is ambiguous", c),
            object: Some(c),
        }
    }

    pub fn type_mismatch(reason: impl Into<String>) -> Self {
        Self::new(PlannerErrorCode::AethraQueryTypeMismatch, reason)
    }

    pub fn not_grouped(expression: impl Into<String>) -> Self {
        let e = expression.into();
        Self {
            code: PlannerErrorCode::AethraQueryNotGrouped,
            message: format!("Expression '{}' is not being grouped", e),
            object: Some(e),
        }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::new(
            PlannerErrorCode::AethraQueryUnsupported,
            format!("{} is not supported", feature.into()),
        )
    }

    pub fn io(path: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::new(
            PlannerErrorCode::AethraQueryIo,
            format!("Failed to read query '{}': {}", path, reason),
        )
    }

    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending table, column or expression if applicable
    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
