//! Declarative step descriptor

use crate::frame::Data;
use eyre::Result;
use std::fmt;

/// What a step should do when it fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnError {
    #[default]
    Fail,
    Skip,
    Retry,
}

/// A named pipeline step with an error policy and retry budget
///
/// This is a plain descriptor: [`Pipeline`](super::Pipeline) does not read
/// it, and nothing enforces `on_error` or `retries`.
pub struct PipelineStep {
    pub name: String,
    pub func: Box<dyn Fn(Data) -> Result<Data> + Send + Sync>,
    pub on_error: OnError,
    pub retries: u32,
}

impl PipelineStep {
    /// Create a step with the default policy (`Fail`, 3 retries)
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(Data) -> Result<Data> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
            on_error: OnError::default(),
            retries: 3,
        }
    }

    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

impl fmt::Debug for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStep")
            .field("name", &self.name)
            .field("on_error", &self.on_error)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}
