//! Encoder error types
//!
//! Error codes:
//! - AETHRA_ENCODE_UNSUPPORTED

use std::fmt;

/// Encoder-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeErrorCode {
    /// The plan holds an operator or shape the engine cannot execute
    AethraEncodeUnsupported,
}

impl EncodeErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            EncodeErrorCode::AethraEncodeUnsupported => "AETHRA_ENCODE_UNSUPPORTED",
        }
    }
}

impl fmt::Display for EncodeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Encoder error with the operator that could not be encoded
#[derive(Debug, Clone)]
pub struct EncodeError {
    code: EncodeErrorCode,
    operator: &'static str,
    message: String,
}

impl EncodeError {
    pub fn unsupported(operator: &'static str, reason: impl Into<String>) -> Self {
        Self {
            code: EncodeErrorCode::AethraEncodeUnsupported,
            operator,
            message: reason.into(),
        }
    }

    pub fn code(&self) -> EncodeErrorCode {
        self.code
    }

    /// Operator kind the error was raised for
    pub fn operator(&self) -> &'static str {
        self.operator
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}: {}", self.code, self.operator, self.message)
    }
}

impl std::error::Error for EncodeError {}

pub type EncodeResult<T> = Result<T, EncodeError>;
