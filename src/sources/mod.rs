//! Extractors for data sources
//!
//! - [`CsvExtractor`]: local CSV files
//! - [`ApiExtractor`]: REST endpoints returning JSON

mod api;
mod csv;

pub use api::ApiExtractor;
pub use csv::CsvExtractor;
