//! Typed error kinds raised by extractors, transformers and loaders
//!
//! Everything in the crate returns `eyre::Result`; these kinds ride inside the
//! report so callers can tell them apart:
//!
//! ```
//! use tabular_etl::EtlError;
//!
//! let report = eyre::Report::new(EtlError::NoExtractors);
//! assert!(matches!(
//!     report.downcast_ref::<EtlError>(),
//!     Some(EtlError::NoExtractors)
//! ));
//! ```

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    /// A source file does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A source or destination could not be reached
    #[error("Connection failed: {0}")]
    Connection(String),

    /// An operation was attempted before `connect()`
    #[error("{0} is not connected, call connect() first")]
    NotConnected(String),

    /// Data of the wrong shape was handed to a component
    #[error("Expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Row has {found} cells, table has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    #[error("No extractors configured")]
    NoExtractors,

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),
}
