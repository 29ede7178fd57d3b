//! CLI helper functions
//!
//! Turns a pipeline configuration document into a runnable [`Pipeline`].
//!
//! ```json
//! {
//!   "name": "scores",
//!   "extract": [{"type": "csv", "path": "input.csv"}],
//!   "transform": [
//!     {"op": "drop_duplicates"},
//!     {"op": "drop_nulls", "subset": ["name"]},
//!     {"op": "select_columns", "columns": ["id", "name", "score"]}
//!   ],
//!   "load": [
//!     {"type": "csv", "path": "out/scores.csv"},
//!     {"type": "database", "connection_string": "sqlite://out/scores.db", "table": "scores"}
//!   ]
//! }
//! ```

use crate::{
    client::{Auth, AuthType},
    config::load_config,
    etl::Pipeline,
    frame::{Data, Options},
    sinks::{CsvLoader, DatabaseLoader},
    sources::{ApiExtractor, CsvExtractor},
    transform::TableTransformer,
};
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A whole pipeline described as data
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_name")]
    pub name: String,
    pub extract: Vec<SourceConfig>,
    #[serde(default)]
    pub transform: Vec<TransformConfig>,
    #[serde(default)]
    pub load: Vec<SinkConfig>,
    /// Options handed to every extractor at run time
    #[serde(default)]
    pub options: Options,
}

fn default_name() -> String {
    "etl_pipeline".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Csv {
        path: PathBuf,
        #[serde(default)]
        options: Options,
    },
    Api {
        base_url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        /// One of `apikey`, `bearer`, `basic`, `none`
        #[serde(default)]
        auth: Option<String>,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        password: Option<String>,
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        options: Options,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransformConfig {
    DropDuplicates {
        #[serde(default)]
        subset: Option<Vec<String>>,
    },
    DropNulls {
        #[serde(default)]
        subset: Option<Vec<String>>,
    },
    RenameColumns {
        columns: BTreeMap<String, String>,
    },
    SelectColumns {
        columns: Vec<String>,
    },
    /// Keep rows whose `column` equals `value`
    FilterEquals {
        column: String,
        value: Value,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Csv {
        path: PathBuf,
        #[serde(default)]
        options: Options,
    },
    Database {
        connection_string: String,
        table: String,
        #[serde(default)]
        options: Options,
    },
}

/// Load a pipeline document, applying `prefix`-ed environment overrides
pub fn load_pipeline_config(path: &Path, prefix: &str) -> Result<PipelineConfig> {
    if !path.exists() {
        eyre::bail!("Pipeline config not found: {}", path.display());
    }
    let config = load_config(Some(path), prefix)?;
    serde_json::from_value(Value::Object(config))
        .with_context(|| format!("Invalid pipeline config: {}", path.display()))
}

/// Assemble a [`Pipeline`] from its description
pub fn build_pipeline(config: &PipelineConfig) -> Result<Pipeline> {
    let mut pipeline = Pipeline::new(&config.name);

    for source in &config.extract {
        pipeline = match source {
            SourceConfig::Csv { path, options } => {
                pipeline.add_extractor(CsvExtractor::new(path).with_config(options.clone()))
            }
            SourceConfig::Api {
                base_url,
                headers,
                auth,
                username,
                password,
                token,
                options,
            } => {
                let auth = match auth {
                    Some(kind) => {
                        let kind: AuthType = kind
                            .parse()
                            .map_err(|_| eyre::eyre!("Unknown auth type: {}", kind))?;
                        Auth::new(&kind, username.clone(), password.clone(), token.clone())
                    }
                    None => Auth::None,
                };
                let extractor = headers.iter().fold(
                    ApiExtractor::new(base_url.as_str())
                        .with_auth(auth)
                        .with_config(options.clone()),
                    |extractor, (name, value)| extractor.with_header(name.as_str(), value.as_str()),
                );
                pipeline.add_extractor(extractor)
            }
        };
    }

    if !config.transform.is_empty() {
        pipeline = pipeline.add_transformer(build_transformer(&config.transform));
    }

    for sink in &config.load {
        pipeline = match sink {
            SinkConfig::Csv { path, options } => {
                pipeline.add_loader(CsvLoader::new(path).with_config(options.clone()))
            }
            SinkConfig::Database {
                connection_string,
                table,
                options,
            } => pipeline.add_loader(
                DatabaseLoader::new(connection_string.as_str(), table.as_str())
                    .with_config(options.clone()),
            ),
        };
    }

    Ok(pipeline)
}

fn build_transformer(steps: &[TransformConfig]) -> TableTransformer {
    fn borrowed(cols: &Option<Vec<String>>) -> Option<Vec<&str>> {
        cols.as_ref()
            .map(|cols| cols.iter().map(String::as_str).collect())
    }

    steps
        .iter()
        .fold(TableTransformer::new(), |transformer, step| match step {
            TransformConfig::DropDuplicates { subset } => {
                transformer.drop_duplicates(borrowed(subset))
            }
            TransformConfig::DropNulls { subset } => transformer.drop_nulls(borrowed(subset)),
            TransformConfig::RenameColumns { columns } => transformer
                .rename_columns(columns.iter().map(|(k, v)| (k.as_str(), v.as_str()))),
            TransformConfig::SelectColumns { columns } => {
                transformer.select_columns(columns.iter().map(String::as_str).collect())
            }
            TransformConfig::FilterEquals { column, value } => {
                let (column, value) = (column.clone(), value.clone());
                transformer.filter_rows(move |row| row.get(&column) == Some(&value))
            }
        })
}

/// Load, build and run the pipeline described in `config_path`
///
/// Returns the pipeline name and its final data.
pub async fn run_from_config(config_path: &Path, prefix: &str) -> Result<(String, Data)> {
    log::info!("Loading pipeline config from {}", config_path.display());
    let config = load_pipeline_config(config_path, prefix)?;
    log::info!(
        "Pipeline '{}': {} source(s), {} transform step(s), {} destination(s)",
        config.name,
        config.extract.len(),
        config.transform.len(),
        config.load.len()
    );

    let mut pipeline = build_pipeline(&config)?;
    let data = pipeline.run(&config.options).await?;
    Ok((config.name, data))
}
