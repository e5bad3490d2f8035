//! Database catalog built from a directory of Arrow IPC files
//!
//! Every `*.arrow` file in the database directory is one table. Tables are
//! kept in name order so that planning is deterministic regardless of the
//! order the filesystem lists them in.

mod ipc;
mod errors;
mod types;

pub use ipc::{arrow_to_sql_type, read_arrow_schema, table_from_arrow_file, ARROW_EXTENSION};
pub use errors::{CatalogError, CatalogErrorCode, CatalogResult};
pub use types::{Column, SqlType, Table, MAX_DECIMAL_PRECISION};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

/// Schema of one Arrow database directory
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    #[serde(skip)]
    root: PathBuf,
    #[serde(skip)]
    case_sensitive: bool,
    tables: Vec<Arc<Table>>,
}

impl Catalog {
    /// Builds the catalog for `path`.
    ///
    /// Fails if `path` is not an existing directory, if it contains no
    /// `.arrow` files, or if any Arrow file cannot be described.
    pub fn from_directory(path: &Path, case_sensitive: bool) -> CatalogResult<Self> {
        if !path.is_dir() {
            return Err(CatalogError::not_found(path));
        }

        let entries = fs::read_dir(path).map_err(|e| CatalogError::unreadable(path, e))?;

        let mut table_files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::unreadable(path, e))?;
            let file = entry.path();

            if file.is_file()
                && file
                    .extension()
                    .map_or(false, |ext| ext == ARROW_EXTENSION)
            {
                table_files.push(file);
            }
        }

        if table_files.is_empty() {
            return Err(CatalogError::empty(path));
        }

        table_files.sort();

        let mut tables = Vec::with_capacity(table_files.len());
        for file in &table_files {
            tables.push(Arc::new(table_from_arrow_file(file)?));
        }

        Ok(Self {
            root: path.to_path_buf(),
            case_sensitive,
            tables,
        })
    }

    /// Builds a catalog from already-described tables
    pub fn from_tables(root: impl Into<PathBuf>, tables: Vec<Table>, case_sensitive: bool) -> Self {
        let mut tables: Vec<Arc<Table>> = tables.into_iter().map(Arc::new).collect();
        tables.sort_by(|a, b| a.name().cmp(b.name()));
        Self {
            root: root.into(),
            case_sensitive,
            tables,
        }
    }

    /// The database directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tables(&self) -> &[Arc<Table>] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name()).collect()
    }

    /// Finds a table by name, ignoring ASCII case unless the catalog is case-sensitive
    pub fn lookup(&self, name: &str) -> Option<&Arc<Table>> {
        self.tables.iter().find(|t| {
            if self.case_sensitive {
                t.name() == name
            } else {
                t.name().eq_ignore_ascii_case(name)
            }
        })
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}
