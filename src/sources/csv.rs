//! CSV file extractor

use crate::error::EtlError;
use crate::etl::Extractor;
use crate::frame::{
    DEFAULT_NA_VALUES, Data, Options, Table, infer_cell, merge_options, parse_options,
};
use std::collections::HashMap;
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Read options, taken from the extractor config merged with call options
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ReadOptions {
    delimiter: char,
    has_headers: bool,
    infer_types: bool,
    /// Extra field values read as missing
    na_values: Vec<String>,
    keep_default_na: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_headers: true,
            infer_types: true,
            na_values: Vec::new(),
            keep_default_na: true,
        }
    }
}

/// Extractor for a local CSV file
///
/// Reads the whole file into one [`Table`]. Column names come from the
/// header row (or are `column_0`, `column_1`, ... with `has_headers: false`)
/// and keep their file order. A repeated header name gets a numeric suffix:
/// `a,a,a` becomes `a`, `a.1`, `a.2`.
///
/// Options: `delimiter` (default `,`), `has_headers` (default `true`),
/// `infer_types` (default `true`), `na_values` (extra markers read as null
/// when inferring types), `keep_default_na` (default `true`: also treat
/// [`DEFAULT_NA_VALUES`] such as `NA`, `null` and `NaN` as null).
///
/// # Example
/// ```no_run
/// use tabular_etl::etl::Extractor;
/// use tabular_etl::frame::Options;
/// use tabular_etl::sources::CsvExtractor;
///
/// # async fn example() -> eyre::Result<()> {
/// let mut extractor = CsvExtractor::new("data/input.csv");
/// extractor.connect().await?;
/// let data = extractor.extract(&Options::new()).await?;
/// extractor.disconnect().await?;
/// println!("{} rows", data.len());
/// # Ok(())
/// # }
/// ```
pub struct CsvExtractor {
    path: PathBuf,
    config: Options,
}

impl CsvExtractor {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config: Options::new(),
        }
    }

    /// Set default read options for this extractor
    pub fn with_config(mut self, config: Options) -> Self {
        self.config = config;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self, options: &ReadOptions) -> Result<Table> {
        let delimiter = u8::try_from(options.delimiter).map_err(|_| {
            EtlError::InvalidOption(format!(
                "delimiter must be a single-byte character, got '{}'",
                options.delimiter
            ))
        })?;

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(options.has_headers)
            .from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record
                .with_context(|| format!("Failed to parse CSV file: {}", self.path.display()))?;
            records.push(record);
        }

        let columns: Vec<String> = if options.has_headers {
            dedupe_headers(
                reader
                    .headers()
                    .with_context(|| {
                        format!("Failed to read CSV header: {}", self.path.display())
                    })?
                    .iter(),
            )
        } else {
            let width = records.first().map_or(0, |r| r.len());
            (0..width).map(|i| format!("column_{}", i)).collect()
        };

        let mut na_values: Vec<String> = Vec::new();
        if options.keep_default_na {
            na_values.extend(DEFAULT_NA_VALUES.iter().map(|v| v.to_string()));
        }
        na_values.extend(options.na_values.iter().cloned());

        let mut table = Table::new(columns)?;
        for record in &records {
            let row = record
                .iter()
                .map(|field| infer_cell(field, options.infer_types, &na_values))
                .collect();
            table.push_row(row)?;
        }

        Ok(table)
    }
}

/// Suffix repeated header names with `.1`, `.2`, ... skipping names already taken
fn dedupe_headers<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    names
        .map(|name| {
            let mut name = name.to_string();
            let mut count = counts.get(&name).copied().unwrap_or(0);
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{}.{}", name, count);
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), count + 1);
            name
        })
        .collect()
}

#[async_trait]
impl Extractor for CsvExtractor {
    fn name(&self) -> &str {
        "csv"
    }

    async fn connect(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Err(EtlError::NotFound(self.path.clone()).into());
        }
        log::info!("Connected to CSV file: {}", self.path.display());
        Ok(())
    }

    async fn extract(&mut self, options: &Options) -> Result<Data> {
        let options: ReadOptions = parse_options(merge_options(&self.config, options))?;
        let table = self.read(&options)?;
        log::info!(
            "Extracted {} rows from {}",
            table.len(),
            self.path.display()
        );
        Ok(Data::Table(table))
    }

    async fn disconnect(&mut self) -> Result<()> {
        log::info!("Disconnected from CSV source");
        Ok(())
    }
}
