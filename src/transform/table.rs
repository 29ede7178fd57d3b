//! Table transformer
//!
//! Holds an ordered list of named `Table -> Table` steps and applies them
//! left to right.

use crate::etl::Transformer;
use crate::frame::{Data, Row, Table};
use eyre::Result;
use std::collections::HashMap;

type Step = Box<dyn Fn(Table) -> Result<Table> + Send + Sync>;

/// Transformer for tabular batches
///
/// Steps are applied in the order they were added. Nothing is checked
/// between steps beyond what [`Table`] itself enforces.
///
/// # Example
/// ```
/// use tabular_etl::etl::Transformer;
/// use tabular_etl::frame::{Data, Table};
/// use tabular_etl::transform::TableTransformer;
/// use serde_json::json;
///
/// let table = Table::from_rows(
///     vec!["id", "name"],
///     vec![
///         vec![json!(1), json!("alice")],
///         vec![json!(1), json!("alice")],
///         vec![json!(2), json!(null)],
///     ],
/// )
/// .unwrap();
///
/// let cleaner = TableTransformer::new()
///     .drop_duplicates(None)
///     .drop_nulls(Some(vec!["name"]))
///     .rename_columns([("id", "user_id")]);
///
/// let output = cleaner.transform(Data::Table(table)).unwrap();
/// let output = output.as_table().unwrap();
/// assert_eq!(output.len(), 1);
/// assert_eq!(output.columns(), ["user_id", "name"]);
/// ```
#[derive(Default)]
pub struct TableTransformer {
    steps: Vec<(String, Step)>,
}

impl TableTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary named step
    pub fn add_transformation<F>(mut self, name: impl Into<String>, step: F) -> Self
    where
        F: Fn(Table) -> Result<Table> + Send + Sync + 'static,
    {
        self.steps.push((name.into(), Box::new(step)));
        self
    }

    /// Remove repeated rows, comparing `subset` columns (all by default)
    pub fn drop_duplicates(self, subset: Option<Vec<&str>>) -> Self {
        let subset = owned(subset);
        self.add_transformation("drop_duplicates", move |table| {
            table.drop_duplicates(subset.as_deref())
        })
    }

    /// Remove rows with a null in any `subset` column (all by default)
    pub fn drop_nulls(self, subset: Option<Vec<&str>>) -> Self {
        let subset = owned(subset);
        self.add_transformation("drop_nulls", move |table| {
            table.drop_nulls(subset.as_deref())
        })
    }

    /// Rename columns by `(old, new)` pairs
    pub fn rename_columns<'a>(self, mapping: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mapping: HashMap<String, String> = mapping
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        self.add_transformation("rename_columns", move |table| table.rename(&mapping))
    }

    /// Keep only `columns`, in that order
    pub fn select_columns(self, columns: Vec<&str>) -> Self {
        let columns: Vec<String> = columns.into_iter().map(String::from).collect();
        self.add_transformation("select_columns", move |table| table.select(&columns))
    }

    /// Keep rows matching `predicate`
    pub fn filter_rows<F>(self, predicate: F) -> Self
    where
        F: Fn(&Row<'_>) -> bool + Send + Sync + 'static,
    {
        self.add_transformation("filter_rows", move |table| Ok(table.filter(&predicate)))
    }

    /// Names of the registered steps, in order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Apply every step to a table
    pub fn apply(&self, table: Table) -> Result<Table> {
        let mut result = table;
        for (name, step) in &self.steps {
            result = step(result)?;
            log::debug!("Applied transformation: {}", name);
        }
        Ok(result)
    }
}

impl Transformer for TableTransformer {
    fn transform(&self, input: Data) -> Result<Data> {
        let table = input.into_table()?;
        let result = self.apply(table)?;
        log::info!("Transformed table: {} rows", result.len());
        Ok(Data::Table(result))
    }
}

fn owned(subset: Option<Vec<&str>>) -> Option<Vec<String>> {
    subset.map(|cols| cols.into_iter().map(String::from).collect())
}
