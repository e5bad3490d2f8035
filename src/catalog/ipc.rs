//! Arrow IPC schema extraction
//!
//! Only the footer is read: `FileReader::try_new` validates the magic
//! bytes, decodes the footer flatbuffer and stops before any record batch.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use arrow::datatypes::{DataType, Schema};
use arrow::ipc::reader::FileReader;

use super::errors::{CatalogError, CatalogResult};
use super::types::{Column, SqlType, Table};

/// File extension identifying table files inside a database directory
pub const ARROW_EXTENSION: &str = "arrow";

/// Reads the schema stored in the footer of an Arrow IPC file.
pub fn read_arrow_schema(path: &Path) -> CatalogResult<Schema> {
    let file = File::open(path).map_err(|e| CatalogError::unreadable(path, e))?;
    let reader =
        FileReader::try_new(BufReader::new(file), None).map_err(|e| CatalogError::unreadable(path, e))?;
    Ok(reader.schema().as_ref().clone())
}

/// Maps an Arrow column type onto the SQL type the planner reasons with.
///
/// Every integer width collapses to INTEGER; the engine reads the physical
/// width from the file itself.
pub fn arrow_to_sql_type(data_type: &DataType) -> Option<SqlType> {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => Some(SqlType::Integer),
        DataType::FixedSizeBinary(width) => Some(SqlType::Char((*width).max(0) as u32)),
        DataType::Utf8 | DataType::LargeUtf8 => Some(SqlType::Varchar),
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            Some(SqlType::Decimal {
                precision: *precision,
                scale: *scale,
            })
        }
        DataType::Date32 | DataType::Date64 => Some(SqlType::Date),
        DataType::Float64 => Some(SqlType::Double),
        _ => None,
    }
}

/// Builds the table descriptor for one Arrow file.
pub fn table_from_arrow_file(path: &Path) -> CatalogResult<Table> {
    let schema = read_arrow_schema(path)?;

    let mut columns = Vec::with_capacity(schema.fields().len());
    for field in schema.fields().iter() {
        let ty = arrow_to_sql_type(field.data_type())
            .ok_or_else(|| CatalogError::unsupported_type(path, field.name(), field.data_type()))?;
        columns.push(Column::new(field.name().clone(), ty));
    }

    let name = table_name_for(path)
        .ok_or_else(|| CatalogError::unreadable(path, "file name is not valid UTF-8"))?;

    Ok(Table::new(name, path, columns))
}

/// Table name for an Arrow file: the file name without `.arrow`
pub fn table_name_for(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::write_arrow_table;
    use arrow::datatypes::Field;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_type_mapping() {
        assert_eq!(arrow_to_sql_type(&DataType::Int64), Some(SqlType::Integer));
        assert_eq!(
            arrow_to_sql_type(&DataType::FixedSizeBinary(1)),
            Some(SqlType::Char(1))
        );
        assert_eq!(arrow_to_sql_type(&DataType::LargeUtf8), Some(SqlType::Varchar));
        assert_eq!(
            arrow_to_sql_type(&DataType::Decimal128(15, 2)),
            Some(SqlType::Decimal {
                precision: 15,
                scale: 2
            })
        );
        assert_eq!(arrow_to_sql_type(&DataType::Date32), Some(SqlType::Date));
        assert_eq!(arrow_to_sql_type(&DataType::Float64), Some(SqlType::Double));
        assert_eq!(arrow_to_sql_type(&DataType::Float32), None);
        assert_eq!(arrow_to_sql_type(&DataType::Boolean), None);
    }

    #[test]
    fn test_table_from_arrow_file() {
        let dir = TempDir::new().unwrap();
        let path = write_arrow_table(
            dir.path(),
            "nation",
            vec![
                Field::new("n_nationkey", DataType::Int32, false),
                Field::new("n_name", DataType::FixedSizeBinary(25), false),
                Field::new("n_comment", DataType::Utf8, false),
            ],
        );

        let table = table_from_arrow_file(&path).unwrap();
        assert_eq!(table.name(), "nation");
        assert_eq!(table.width(), 3);
        assert_eq!(table.columns()[1].ty, SqlType::Char(25));
        assert_eq!(table.columns()[2].name, "n_comment");
    }

    #[test]
    fn test_unsupported_column_type() {
        let dir = TempDir::new().unwrap();
        let path = write_arrow_table(
            dir.path(),
            "flags",
            vec![Field::new("flag", DataType::Boolean, false)],
        );

        let err = table_from_arrow_file(&path).unwrap_err();
        assert_eq!(err.code().code(), "AETHRA_CATALOG_UNSUPPORTED_TYPE");
        assert!(err.message().contains("flag"));
    }

    #[test]
    fn test_garbage_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.arrow");
        fs::write(&path, b"not an arrow file").unwrap();

        let err = read_arrow_schema(&path).unwrap_err();
        assert_eq!(err.code().code(), "AETHRA_CATALOG_UNREADABLE");
    }
}
