//! Loaders for data destinations
//!
//! - [`CsvLoader`]: local CSV files
//! - [`DatabaseLoader`]: SQL tables (SQLite)

mod csv;
mod database;

pub use csv::CsvLoader;
pub use database::{DatabaseLoader, IfExists};
