//! In-memory tabular batch

use crate::error::EtlError;
use eyre::Result;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// A whole-in-memory table: named columns and rows of JSON-typed cells
///
/// Column names are unique and keep their order. Every row has exactly one
/// cell per column; a missing value is `Value::Null`.
///
/// # Example
/// ```
/// use tabular_etl::frame::Table;
/// use serde_json::json;
///
/// let mut table = Table::new(vec!["id", "name"]).unwrap();
/// table.push_row(vec![json!(1), json!("alice")]).unwrap();
/// table.push_row(vec![json!(2), json!(null)]).unwrap();
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.get(0, "name"), Some(&json!("alice")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given column names
    ///
    /// # Errors
    /// Returns [`EtlError::DuplicateColumn`] if a name appears twice
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Result<Self> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        ensure_unique(&columns)?;
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create a table from columns and rows in one go
    pub fn from_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build a table from a JSON array of objects
    ///
    /// Columns appear in first-seen key order across all records. Keys absent
    /// from a record become nulls. Nested values are kept as-is.
    pub fn from_records(records: &Value) -> Result<Self> {
        let items = records.as_array().ok_or(EtlError::TypeMismatch {
            expected: "array of objects",
            found: json_kind(records),
        })?;

        let mut columns: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for item in items {
            let obj = item.as_object().ok_or(EtlError::TypeMismatch {
                expected: "object",
                found: json_kind(item),
            })?;
            for key in obj.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = items
            .iter()
            .filter_map(Value::as_object)
            .map(|obj| {
                columns
                    .iter()
                    .map(|c| obj.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Convert rows back into a JSON array of objects
    pub fn to_records(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    let obj: Map<String, Value> = self
                        .columns
                        .iter()
                        .cloned()
                        .zip(row.iter().cloned())
                        .collect();
                    Value::Object(obj)
                })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell at `row` in column `column`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Append a row
    ///
    /// # Errors
    /// Returns [`EtlError::RowWidth`] if the row does not match the column count
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            }
            .into());
        }
        self.rows.push(row);
        Ok(())
    }

    /// Remove repeated rows, keeping the first occurrence
    ///
    /// With a `subset`, only those columns are compared. Numbers compare by
    /// value, so `90` and `90.0` are the same cell.
    pub fn drop_duplicates(self, subset: Option<&[String]>) -> Result<Self> {
        let indices = self.subset_indices(subset)?;
        let mut seen = HashSet::new();
        let Self { columns, rows } = self;

        let rows = rows
            .into_iter()
            .filter(|row| {
                let key: Vec<String> = indices.iter().map(|&i| cell_key(&row[i])).collect();
                seen.insert(key)
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Remove rows holding a null in any of the `subset` columns (all columns by default)
    pub fn drop_nulls(self, subset: Option<&[String]>) -> Result<Self> {
        let indices = self.subset_indices(subset)?;
        let Self { columns, rows } = self;

        let rows = rows
            .into_iter()
            .filter(|row| indices.iter().all(|&i| !row[i].is_null()))
            .collect();

        Ok(Self { columns, rows })
    }

    /// Rename columns by `old -> new` mapping
    ///
    /// Names not in the mapping are left untouched, and mapping keys that are
    /// not columns are ignored.
    ///
    /// # Errors
    /// Returns [`EtlError::DuplicateColumn`] if the renamed set would collide
    pub fn rename(mut self, mapping: &HashMap<String, String>) -> Result<Self> {
        let renamed: Vec<String> = self
            .columns
            .iter()
            .map(|c| mapping.get(c).cloned().unwrap_or_else(|| c.clone()))
            .collect();
        ensure_unique(&renamed)?;
        self.columns = renamed;
        Ok(self)
    }

    /// Keep only `columns`, in the order given
    ///
    /// # Errors
    /// Returns [`EtlError::MissingColumn`] for an unknown name and
    /// [`EtlError::DuplicateColumn`] if a name is requested twice
    pub fn select(self, columns: &[String]) -> Result<Self> {
        ensure_unique(columns)?;
        let indices = columns
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .into_iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Self {
            columns: columns.to_vec(),
            rows,
        })
    }

    /// Keep rows for which `predicate` returns true
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Row<'_>) -> bool,
    {
        let Self { columns, rows } = self;
        let rows = rows
            .into_iter()
            .filter(|cells| {
                predicate(&Row {
                    columns: &columns,
                    cells,
                })
            })
            .collect();
        Self { columns, rows }
    }

    fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::MissingColumn(name.to_string()).into())
    }

    fn subset_indices(&self, subset: Option<&[String]>) -> Result<Vec<usize>> {
        match subset {
            Some(names) => names.iter().map(|n| self.require_column(n)).collect(),
            None => Ok((0..self.columns.len()).collect()),
        }
    }
}

/// Borrowed view of one row, handed to row predicates
pub struct Row<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl Row<'_> {
    /// Cell by column name; `None` if the column does not exist
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.cells[i])
    }

    pub fn cells(&self) -> &[Value] {
        self.cells
    }
}

/// Hashable form of a cell for duplicate detection
fn cell_key(cell: &Value) -> String {
    match cell {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            // Integral floats in i64 range share the integer key
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn ensure_unique(columns: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for c in columns {
        if !seen.insert(c.as_str()) {
            return Err(EtlError::DuplicateColumn(c.clone()).into());
        }
    }
    Ok(())
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
