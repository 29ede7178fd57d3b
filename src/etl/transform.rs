//! Transformer trait for batch transformation

use crate::frame::Data;
use eyre::Result;

/// Transformer trait for turning one batch into another
///
/// Implementors define how to transform a batch:
/// - Data cleaning (duplicates, missing values)
/// - Reshaping (renaming, projecting columns)
/// - Filtering rows
///
/// # Example
/// ```
/// use tabular_etl::etl::Transformer;
/// use tabular_etl::frame::Data;
/// use eyre::Result;
///
/// struct DropBlankRows;
///
/// impl Transformer for DropBlankRows {
///     fn transform(&self, input: Data) -> Result<Data> {
///         let table = input.into_table()?;
///         Ok(table
///             .filter(|row| row.cells().iter().any(|c| !c.is_null()))
///             .into())
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Transform a whole batch
    ///
    /// # Errors
    /// Returns an error if the input has the wrong shape or a step fails
    fn transform(&self, input: Data) -> Result<Data>;
}

impl<F> Transformer for F
where
    F: Fn(Data) -> Result<Data> + Send + Sync,
{
    fn transform(&self, input: Data) -> Result<Data> {
        self(input)
    }
}
