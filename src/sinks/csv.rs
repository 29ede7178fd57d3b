//! CSV file loader

use crate::error::EtlError;
use crate::etl::Loader;
use crate::frame::{Data, Options, merge_options, parse_options, render_cell};
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum WriteMode {
    #[default]
    Overwrite,
    Append,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WriteOptions {
    delimiter: char,
    header: bool,
    mode: WriteMode,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            header: true,
            mode: WriteMode::Overwrite,
        }
    }
}

/// Loader that writes a table to a CSV file
///
/// Options: `delimiter` (default `,`), `header` (default `true`), `mode`
/// (`overwrite` by default, or `append`; appending only writes the header
/// when the file is new or empty). Nulls are written as empty fields.
///
/// # Example
/// ```no_run
/// use tabular_etl::etl::Loader;
/// use tabular_etl::frame::{Data, Options, Table};
/// use tabular_etl::sinks::CsvLoader;
///
/// # async fn example(table: Table) -> eyre::Result<()> {
/// let mut loader = CsvLoader::new("out/result.csv");
/// loader.connect().await?;
/// let rows = loader.load(&Data::Table(table), &Options::new()).await?;
/// loader.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct CsvLoader {
    path: PathBuf,
    config: Options,
}

impl CsvLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: Options::new(),
        }
    }

    /// Set default write options for this loader
    pub fn with_config(mut self, config: Options) -> Self {
        self.config = config;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Loader for CsvLoader {
    fn name(&self) -> &str {
        "csv"
    }

    async fn connect(&mut self) -> Result<()> {
        let parent = self.path.parent().unwrap_or(Path::new(""));
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        log::info!("Output directory ready: {}", parent.display());
        Ok(())
    }

    async fn load(&mut self, data: &Data, options: &Options) -> Result<usize> {
        let table = data.as_table()?;
        let options: WriteOptions = parse_options(merge_options(&self.config, options))?;
        let delimiter = u8::try_from(options.delimiter).map_err(|_| {
            EtlError::InvalidOption(format!(
                "delimiter must be a single-byte character, got '{}'",
                options.delimiter
            ))
        })?;

        let append = options.mode == WriteMode::Append;
        let has_content = std::fs::metadata(&self.path).is_ok_and(|m| m.len() > 0);
        let write_header =
            options.header && !table.columns().is_empty() && !(append && has_content);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(file);

        if write_header {
            writer.write_record(table.columns())?;
        }
        for row in table.rows() {
            writer.write_record(row.iter().map(render_cell))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write CSV file: {}", self.path.display()))?;

        log::info!("Loaded {} rows to {}", table.len(), self.path.display());
        Ok(table.len())
    }

    async fn disconnect(&mut self) -> Result<()> {
        log::info!("CSV loader disconnected");
        Ok(())
    }
}
