//! Tabular ETL
//!
//! A small extract-transform-load toolkit: CSV and REST sources, a table
//! transformer, CSV and SQL sinks, and a linear pipeline that runs them.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod etl;
pub mod frame;
pub mod logging;
pub mod sinks;
pub mod sources;
pub mod transform;

// Re-exports for convenience
pub use client::{Auth, AuthType};
pub use error::EtlError;
pub use etl::{Extractor, Loader, OnError, Pipeline, PipelineState, PipelineStep, Transformer};
pub use frame::{Data, Options, Table};
pub use sinks::{CsvLoader, DatabaseLoader};
pub use sources::{ApiExtractor, CsvExtractor};
pub use transform::TableTransformer;
