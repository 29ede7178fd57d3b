//! Extractor trait for reading data from sources

use crate::frame::{Data, Options};
use async_trait::async_trait;
use eyre::Result;

/// Extractor trait for extracting a batch from a source
///
/// Implementors prepare access in `connect`, produce data in `extract` and
/// release whatever they hold in `disconnect`. The pipeline always calls
/// `disconnect` after a successful `connect`, even when `extract` fails.
///
/// # Example
/// ```no_run
/// use tabular_etl::etl::Extractor;
/// use tabular_etl::frame::{Data, Options, Table};
/// use async_trait::async_trait;
/// use eyre::Result;
///
/// struct EmptySource;
///
/// #[async_trait]
/// impl Extractor for EmptySource {
///     fn name(&self) -> &str {
///         "empty"
///     }
///
///     async fn connect(&mut self) -> Result<()> {
///         Ok(())
///     }
///
///     async fn extract(&mut self, _options: &Options) -> Result<Data> {
///         Ok(Table::new(vec!["id"])?.into())
///     }
///
///     async fn disconnect(&mut self) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Prepare access to the source
    ///
    /// # Errors
    /// Returns an error if the source is missing or unreachable
    async fn connect(&mut self) -> Result<()>;

    /// Extract the whole batch
    ///
    /// `options` override the extractor's own config key by key.
    ///
    /// # Errors
    /// Returns an error if extraction fails (network, I/O, parsing, etc.)
    async fn extract(&mut self, options: &Options) -> Result<Data>;

    /// Release resources; safe to call when `connect` never succeeded
    async fn disconnect(&mut self) -> Result<()>;
}
