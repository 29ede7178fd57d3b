//! The value handed between pipeline stages

use super::Table;
use crate::error::EtlError;
use eyre::Result;
use serde_json::Value;

/// Data flowing through a pipeline
///
/// File and database components work on [`Table`]s. API responses arrive as
/// raw [`Data::Json`] unless converted to records. A pipeline with more than
/// one extractor yields [`Data::Many`], one entry per extractor in
/// registration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Table(Table),
    Json(Value),
    Many(Vec<Data>),
}

impl Data {
    /// Short name of the variant, used in type mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Data::Table(_) => "table",
            Data::Json(_) => "json",
            Data::Many(_) => "many",
        }
    }

    /// Borrow the table, or fail with [`EtlError::TypeMismatch`]
    pub fn as_table(&self) -> Result<&Table> {
        match self {
            Data::Table(table) => Ok(table),
            other => Err(EtlError::TypeMismatch {
                expected: "table",
                found: other.kind(),
            }
            .into()),
        }
    }

    /// Take the table out, or fail with [`EtlError::TypeMismatch`]
    pub fn into_table(self) -> Result<Table> {
        match self {
            Data::Table(table) => Ok(table),
            other => Err(EtlError::TypeMismatch {
                expected: "table",
                found: other.kind(),
            }
            .into()),
        }
    }

    /// Row count for tables, element count for JSON arrays and batch lists
    pub fn len(&self) -> usize {
        match self {
            Data::Table(table) => table.len(),
            Data::Json(Value::Array(items)) => items.len(),
            Data::Json(Value::Null) => 0,
            Data::Json(_) => 1,
            Data::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Table> for Data {
    fn from(table: Table) -> Self {
        Data::Table(table)
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Data::Json(value)
    }
}
