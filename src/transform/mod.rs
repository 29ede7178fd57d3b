//! Transformer implementations for tabular batches

mod table;

pub use table::TableTransformer;
