//! Shared fixtures for integration tests
//!
//! Each database is a temporary directory of Arrow IPC files holding a
//! schema and no record batches. Planning only reads schemas.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::FileWriter;
use tempfile::TempDir;

pub fn write_table(dir: &Path, name: &str, fields: Vec<Field>) -> PathBuf {
    let path = dir.join(format!("{}.arrow", name));
    let schema = Arc::new(Schema::new(fields));
    let file = File::create(&path).unwrap();
    let mut writer = FileWriter::try_new(file, &schema).unwrap();
    writer.finish().unwrap();
    path
}

/// `orders(o_id, o_custkey, o_total, o_date)` and
/// `customer(c_id, c_name, c_nation)`
pub fn sales_database() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_table(
        dir.path(),
        "orders",
        vec![
            Field::new("o_id", DataType::Int32, false),
            Field::new("o_custkey", DataType::Int32, false),
            Field::new("o_total", DataType::Decimal128(12, 2), false),
            Field::new("o_date", DataType::Date32, false),
        ],
    );
    write_table(
        dir.path(),
        "customer",
        vec![
            Field::new("c_id", DataType::Int32, false),
            Field::new("c_name", DataType::Utf8, false),
            Field::new("c_nation", DataType::Int32, false),
        ],
    );
    dir
}

/// Writes `sql` to a query file next to the database
pub fn write_query(dir: &Path, name: &str, sql: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, sql).unwrap();
    path
}
