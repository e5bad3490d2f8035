//! Catalog error types
//!
//! Error codes:
//! - AETHRA_CATALOG_NOT_FOUND
//! - AETHRA_CATALOG_EMPTY
//! - AETHRA_CATALOG_UNREADABLE
//! - AETHRA_CATALOG_UNSUPPORTED_TYPE

use std::fmt;
use std::path::Path;

/// Catalog-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogErrorCode {
    /// Database path missing or not a directory
    AethraCatalogNotFound,
    /// Directory holds no `.arrow` files
    AethraCatalogEmpty,
    /// An Arrow file's footer or schema could not be read
    AethraCatalogUnreadable,
    /// Arrow column type has no SQL counterpart
    AethraCatalogUnsupportedType,
}

impl CatalogErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogErrorCode::AethraCatalogNotFound => "AETHRA_CATALOG_NOT_FOUND",
            CatalogErrorCode::AethraCatalogEmpty => "AETHRA_CATALOG_EMPTY",
            CatalogErrorCode::AethraCatalogUnreadable => "AETHRA_CATALOG_UNREADABLE",
            CatalogErrorCode::AethraCatalogUnsupportedType => "AETHRA_CATALOG_UNSUPPORTED_TYPE",
        }
    }
}

impl fmt::Display for CatalogErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Catalog error with context
#[derive(Debug, Clone)]
pub struct CatalogError {
    code: CatalogErrorCode,
    message: String,
}

impl CatalogError {
    pub fn not_found(path: &Path) -> Self {
        Self {
            code: CatalogErrorCode::AethraCatalogNotFound,
            message: format!(
                "Cannot create a schema for a non-existent database directory '{}'",
                path.display()
            ),
        }
    }

    pub fn empty(path: &Path) -> Self {
        Self {
            code: CatalogErrorCode::AethraCatalogEmpty,
            message: format!(
                "Cannot create a schema for an empty database '{}'",
                path.display()
            ),
        }
    }

    pub fn unreadable(path: &Path, reason: impl fmt::Display) -> Self {
        Self {
            code: CatalogErrorCode::AethraCatalogUnreadable,
            message: format!(
                "Could not parse the arrow file schema for file '{}': {}",
                path.display(),
                reason
            ),
        }
    }

    pub fn unsupported_type(path: &Path, column: &str, arrow_type: impl fmt::Display) -> Self {
        Self {
            code: CatalogErrorCode::AethraCatalogUnsupportedType,
            message: format!(
                "The Arrow type {} of column '{}' in '{}' is currently not supported",
                arrow_type,
                column,
                path.display()
            ),
        }
    }

    pub fn code(&self) -> CatalogErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CatalogError {}

pub type CatalogResult<T> = Result<T, CatalogError>;
