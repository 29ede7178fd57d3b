//! Pipeline orchestration for ETL operations

use super::{Extractor, Loader, Transformer};
use crate::error::EtlError;
use crate::frame::{Data, Options};
use eyre::{Context, Result};

/// Zero-argument callback run before or after the pipeline body
pub type Hook = Box<dyn FnMut() -> Result<()> + Send>;

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Running,
    Completed,
    Failed,
}

/// ETL Pipeline that orchestrates Extract, Transform, and Load operations
///
/// Runs in a fixed order: pre-hooks, every extractor, every transformer,
/// every loader, post-hooks. Each extractor and loader is connected right
/// before use and disconnected right after, even when the operation fails.
/// The first error aborts the run; loaders that already ran are not undone.
///
/// # Example
/// ```no_run
/// use tabular_etl::etl::Pipeline;
/// use tabular_etl::frame::Options;
/// use tabular_etl::sinks::CsvLoader;
/// use tabular_etl::sources::CsvExtractor;
/// use tabular_etl::transform::TableTransformer;
///
/// # async fn example() -> eyre::Result<()> {
/// let mut pipeline = Pipeline::new("scores")
///     .add_extractor(CsvExtractor::new("input.csv"))
///     .add_transformer(
///         TableTransformer::new()
///             .drop_duplicates(None)
///             .drop_nulls(Some(vec!["name"])),
///     )
///     .add_loader(CsvLoader::new("out/scores.csv"));
///
/// let data = pipeline.run(&Options::new()).await?;
/// println!("Processed {} rows", data.len());
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    name: String,
    extractors: Vec<Box<dyn Extractor>>,
    transformers: Vec<Box<dyn Transformer>>,
    loaders: Vec<Box<dyn Loader>>,
    pre_hooks: Vec<Hook>,
    post_hooks: Vec<Hook>,
    state: PipelineState,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extractors: Vec::new(),
            transformers: Vec::new(),
            loaders: Vec::new(),
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
            state: PipelineState::Created,
        }
    }

    pub fn add_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    pub fn add_transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    pub fn add_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn add_pre_hook(mut self, hook: impl FnMut() -> Result<()> + Send + 'static) -> Self {
        self.pre_hooks.push(Box::new(hook));
        self
    }

    pub fn add_post_hook(mut self, hook: impl FnMut() -> Result<()> + Send + 'static) -> Self {
        self.post_hooks.push(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the complete ETL pipeline
    ///
    /// Steps:
    /// 1. Pre-hooks
    /// 2. Extract from every source (`options` go to each extractor)
    /// 3. Transform, if any transformers are registered
    /// 4. Load the same final data into every destination
    /// 5. Post-hooks
    ///
    /// Returns the final transformed data
    ///
    /// # Errors
    /// Returns the first error raised by any step
    pub async fn run(&mut self, options: &Options) -> Result<Data> {
        log::info!("Starting pipeline: {}", self.name);
        self.state = PipelineState::Running;

        // Pre-hooks sit outside the body: a failure aborts without the body's error log
        for hook in &mut self.pre_hooks {
            if let Err(e) = hook() {
                self.state = PipelineState::Failed;
                return Err(e);
            }
        }

        match self.run_body(options).await {
            Ok(data) => {
                self.state = PipelineState::Completed;
                Ok(data)
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                log::error!("Pipeline failed: {}: {:#}", self.name, e);
                Err(e)
            }
        }
    }

    async fn run_body(&mut self, options: &Options) -> Result<Data> {
        log::debug!("Extracting from {} source(s)...", self.extractors.len());
        let data = self.run_extract(options).await?;
        log::info!("Extracted {} ({} rows/items)", data.kind(), data.len());

        let data = self.run_transform(data)?;

        log::debug!("Loading to {} destination(s)...", self.loaders.len());
        self.run_load(&data).await?;

        log::info!("Pipeline completed: {}", self.name);

        for hook in &mut self.post_hooks {
            hook()?;
        }

        Ok(data)
    }

    async fn run_extract(&mut self, options: &Options) -> Result<Data> {
        match self.extractors.as_mut_slice() {
            [] => Err(EtlError::NoExtractors.into()),
            [single] => extract_scoped(single.as_mut(), options).await,
            many => {
                let mut batches = Vec::with_capacity(many.len());
                for extractor in many.iter_mut() {
                    batches.push(extract_scoped(extractor.as_mut(), options).await?);
                }
                Ok(Data::Many(batches))
            }
        }
    }

    fn run_transform(&self, data: Data) -> Result<Data> {
        if self.transformers.is_empty() {
            log::debug!("No transformers registered, passing data through");
            return Ok(data);
        }

        let mut result = data;
        for transformer in &self.transformers {
            result = transformer.transform(result)?;
        }
        log::info!("Transformed {} ({} rows/items)", result.kind(), result.len());
        Ok(result)
    }

    async fn run_load(&mut self, data: &Data) -> Result<()> {
        let options = Options::new();
        for loader in &mut self.loaders {
            let count = load_scoped(loader.as_mut(), data, &options).await?;
            log::info!("Loaded {} rows via {}", count, loader.name());
        }
        Ok(())
    }
}

/// Connect, extract, and always disconnect once connected
///
/// The extract error takes precedence over a disconnect error.
async fn extract_scoped(extractor: &mut dyn Extractor, options: &Options) -> Result<Data> {
    let name = extractor.name().to_string();
    extractor
        .connect()
        .await
        .with_context(|| format!("Failed to connect extractor '{}'", name))?;

    let result = extractor.extract(options).await;
    let released = extractor.disconnect().await;

    let data = result.with_context(|| format!("Extractor '{}' failed", name))?;
    released.with_context(|| format!("Failed to disconnect extractor '{}'", name))?;
    Ok(data)
}

/// Connect, load, and always disconnect once connected
async fn load_scoped(loader: &mut dyn Loader, data: &Data, options: &Options) -> Result<usize> {
    let name = loader.name().to_string();
    loader
        .connect()
        .await
        .with_context(|| format!("Failed to connect loader '{}'", name))?;

    let result = loader.load(data, options).await;
    let released = loader.disconnect().await;

    let count = result.with_context(|| format!("Loader '{}' failed", name))?;
    released.with_context(|| format!("Failed to disconnect loader '{}'", name))?;
    Ok(count)
}
