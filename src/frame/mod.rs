//! Tabular data model
//!
//! [`Table`] is the in-memory batch every file and database component works
//! on. [`Data`] wraps it together with the other shapes a pipeline can carry.

mod cell;
mod data;
mod table;

pub use cell::{DEFAULT_NA_VALUES, infer_cell, render_cell};
pub use data::Data;
pub use table::{Row, Table};

/// String-keyed options map used for component config and per-call options
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Merge call options over component config; call options win on collision
pub fn merge_options(config: &Options, overrides: &Options) -> Options {
    let mut merged = config.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Deserialize a merged options map into a typed options struct
///
/// Unknown keys are ignored so one map can feed several components.
pub fn parse_options<T: serde::de::DeserializeOwned>(options: Options) -> eyre::Result<T> {
    serde_json::from_value(serde_json::Value::Object(options))
        .map_err(|e| crate::EtlError::InvalidOption(e.to_string()).into())
}
