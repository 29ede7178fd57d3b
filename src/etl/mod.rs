//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides trait definitions for building data pipelines
//! that extract batches from sources, transform them, and load them to
//! destinations, plus the [`Pipeline`] that runs them in order.

mod extract;
mod load;
mod pipeline;
mod step;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::{Hook, Pipeline, PipelineState};
pub use step::{OnError, PipelineStep};
pub use transform::Transformer;
