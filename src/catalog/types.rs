//! SQL types and table descriptors

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

/// Precision cap for derived DECIMAL types
pub const MAX_DECIMAL_PRECISION: u8 = 38;

/// SQL type of a column or expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    BigInt,
    /// Fixed-width character string
    Char(u32),
    Varchar,
    Decimal { precision: u8, scale: i8 },
    Date,
    Double,
    Boolean,
    /// Type of the NULL literal
    Null,
}

impl SqlType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SqlType::Integer | SqlType::BigInt | SqlType::Decimal { .. } | SqlType::Double
        )
    }

    pub fn is_character(&self) -> bool {
        matches!(self, SqlType::Char(_) | SqlType::Varchar)
    }

    /// Returns true if values of the two types can be compared with `=`, `<`, ...
    pub fn is_comparable_with(&self, other: &SqlType) -> bool {
        if *self == SqlType::Null || *other == SqlType::Null {
            return true;
        }
        (self.is_numeric() && other.is_numeric())
            || (self.is_character() && other.is_character())
            || (self == other)
    }

    /// Returns true for BOOLEAN or the NULL literal
    pub fn is_boolean_like(&self) -> bool {
        matches!(self, SqlType::Boolean | SqlType::Null)
    }

    /// Precision and scale of an exact numeric type, if it is one
    fn exact_digits(&self) -> Option<(u8, i8)> {
        match self {
            SqlType::Integer => Some((10, 0)),
            SqlType::BigInt => Some((19, 0)),
            SqlType::Decimal { precision, scale } => Some((*precision, *scale)),
            _ => None,
        }
    }

    /// Result type of `+` and `-`
    pub fn additive(left: SqlType, right: SqlType) -> Option<SqlType> {
        Self::arithmetic(left, right, |(p1, s1), (p2, s2)| {
            let scale = s1.max(s2);
            let integral = (p1 as i16 - s1 as i16).max(p2 as i16 - s2 as i16);
            (clamp_precision(integral + scale as i16 + 1), scale)
        })
    }

    /// Result type of `*`
    pub fn multiplicative(left: SqlType, right: SqlType) -> Option<SqlType> {
        Self::arithmetic(left, right, |(p1, s1), (p2, s2)| {
            (
                clamp_precision(p1 as i16 + p2 as i16),
                s1.saturating_add(s2),
            )
        })
    }

    /// Result type of `/` and `%`
    pub fn divisive(left: SqlType, right: SqlType) -> Option<SqlType> {
        Self::arithmetic(left, right, |(p1, s1), (_, s2)| {
            let scale = s1.max(s2).max(6);
            (clamp_precision(p1 as i16 + scale as i16), scale)
        })
    }

    fn arithmetic(
        left: SqlType,
        right: SqlType,
        decimal: impl Fn((u8, i8), (u8, i8)) -> (u8, i8),
    ) -> Option<SqlType> {
        if !left.is_numeric() && left != SqlType::Null {
            return None;
        }
        if !right.is_numeric() && right != SqlType::Null {
            return None;
        }

        match (left, right) {
            (SqlType::Null, other) | (other, SqlType::Null) => Some(other),
            (SqlType::Double, _) | (_, SqlType::Double) => Some(SqlType::Double),
            (SqlType::Integer, SqlType::Integer) => Some(SqlType::Integer),
            (SqlType::Integer | SqlType::BigInt, SqlType::Integer | SqlType::BigInt) => {
                Some(SqlType::BigInt)
            }
            (l, r) => {
                let (precision, scale) = decimal(l.exact_digits()?, r.exact_digits()?);
                Some(SqlType::Decimal {
                    precision,
                    scale: scale.min(precision as i8),
                })
            }
        }
    }
}

fn clamp_precision(precision: i16) -> u8 {
    precision.clamp(1, MAX_DECIMAL_PRECISION as i16) as u8
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Char(width) => write!(f, "CHAR({})", width),
            SqlType::Varchar => write!(f, "VARCHAR"),
            SqlType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({}, {})", precision, scale)
            }
            SqlType::Date => write!(f, "DATE"),
            SqlType::Double => write!(f, "DOUBLE"),
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Null => write!(f, "NULL"),
        }
    }
}

impl Serialize for SqlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A column of an Arrow table. Arrow columns are never nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The table stored in one Arrow IPC file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    name: String,
    #[serde(skip)]
    path: PathBuf,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            columns,
        }
    }

    /// Table name: the file name without its `.arrow` extension
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Arrow file backing the table
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}
