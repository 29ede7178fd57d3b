//! Loader trait for writing data to destinations

use crate::frame::{Data, Options};
use async_trait::async_trait;
use eyre::Result;

/// Loader trait for loading a batch to a destination
///
/// Implementors define how to write a whole batch at once:
/// - File systems
/// - Databases
///
/// # Example
/// ```no_run
/// use tabular_etl::etl::Loader;
/// use tabular_etl::frame::{Data, Options};
/// use async_trait::async_trait;
/// use eyre::Result;
///
/// struct CountingSink {
///     total: usize,
/// }
///
/// #[async_trait]
/// impl Loader for CountingSink {
///     fn name(&self) -> &str {
///         "counting"
///     }
///
///     async fn connect(&mut self) -> Result<()> {
///         Ok(())
///     }
///
///     async fn load(&mut self, data: &Data, _options: &Options) -> Result<usize> {
///         let rows = data.as_table()?.len();
///         self.total += rows;
///         Ok(rows)
///     }
///
///     async fn disconnect(&mut self) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Loader: Send + Sync {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Prepare the destination
    ///
    /// # Errors
    /// Returns an error if the destination cannot be created or reached
    async fn connect(&mut self) -> Result<()>;

    /// Load the batch to the destination
    ///
    /// Returns the number of rows written
    ///
    /// # Errors
    /// Returns an error if the input is not tabular or writing fails
    async fn load(&mut self, data: &Data, options: &Options) -> Result<usize>;

    /// Release resources; safe to call when `connect` never succeeded
    async fn disconnect(&mut self) -> Result<()>;
}
