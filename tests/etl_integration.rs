//! Integration tests for ETL pipeline functionality
//!
//! These tests run end-to-end workflows with real file and database I/O.

use eyre::Result;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tabular_etl::etl::{Loader, Pipeline, PipelineState};
use tabular_etl::frame::{Data, Options, Table};
use tabular_etl::sinks::{CsvLoader, DatabaseLoader};
use tabular_etl::sources::CsvExtractor;
use tabular_etl::transform::TableTransformer;
use tabular_etl::EtlError;
use tempfile::TempDir;

/// Create the sample input CSV, including a duplicate row and a missing name
fn sample_csv(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("input.csv");
    std::fs::write(
        &path,
        "id,name,score\n1,alice,85\n2,bob,90\n2,bob,90\n3,charlie,75\n4,,95\n",
    )?;
    Ok(path)
}

fn cleaner() -> TableTransformer {
    TableTransformer::new()
        .drop_duplicates(None)
        .drop_nulls(Some(vec!["name"]))
        .select_columns(vec!["id", "name", "score"])
}

fn expected_rows() -> Vec<Vec<Value>> {
    vec![
        vec![json!(1), json!("alice"), json!(85)],
        vec![json!(2), json!("bob"), json!(90)],
        vec![json!(3), json!("charlie"), json!(75)],
    ]
}

#[tokio::test]
async fn test_full_pipeline_csv_to_csv() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = sample_csv(temp_dir.path())?;
    let output = temp_dir.path().join("out/output.csv");

    let mut pipeline = Pipeline::new("test_pipeline")
        .add_extractor(CsvExtractor::new(&input))
        .add_transformer(cleaner())
        .add_loader(CsvLoader::new(&output));

    let result = pipeline.run(&Options::new()).await?;

    assert_eq!(pipeline.state(), PipelineState::Completed);
    assert_eq!(result.as_table()?.rows(), expected_rows().as_slice());

    // Read the written file back through the extractor
    assert!(output.exists(), "Output file should exist");
    let mut reader = Pipeline::new("read_back").add_extractor(CsvExtractor::new(&output));
    let written = reader.run(&Options::new()).await?;
    let written = written.as_table()?;

    assert_eq!(written.columns(), ["id", "name", "score"]);
    assert_eq!(written.rows(), expected_rows().as_slice());

    Ok(())
}

#[tokio::test]
async fn test_full_pipeline_csv_to_database() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = sample_csv(temp_dir.path())?;
    let url = format!("sqlite://{}", temp_dir.path().join("scores.db").display());

    let mut pipeline = Pipeline::new("to_database")
        .add_extractor(CsvExtractor::new(&input))
        .add_transformer(cleaner())
        .add_loader(DatabaseLoader::new(&url, "scores"))
        .add_loader(CsvLoader::new(temp_dir.path().join("copy.csv")));

    pipeline.run(&Options::new()).await?;

    let pool = SqlitePool::connect(&url).await?;
    let rows: Vec<(i64, String, i64)> =
        sqlx::query_as("SELECT id, name, score FROM scores ORDER BY id")
            .fetch_all(&pool)
            .await?;
    pool.close().await;

    assert_eq!(
        rows,
        vec![
            (1, "alice".to_string(), 85),
            (2, "bob".to_string(), 90),
            (3, "charlie".to_string(), 75),
        ]
    );
    assert!(temp_dir.path().join("copy.csv").exists());

    Ok(())
}

#[tokio::test]
async fn test_missing_input_fails_before_loading() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().join("never.csv");

    let mut pipeline = Pipeline::new("missing")
        .add_extractor(CsvExtractor::new(temp_dir.path().join("absent.csv")))
        .add_loader(CsvLoader::new(&output));

    let err = pipeline.run(&Options::new()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<EtlError>(),
        Some(EtlError::NotFound(_))
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(!output.exists());

    Ok(())
}

#[tokio::test]
async fn test_multiple_sources_reach_loader_as_list() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = sample_csv(temp_dir.path())?;
    let output = temp_dir.path().join("output.csv");

    // Two extractors yield a list of batches, which a CSV loader refuses
    let mut pipeline = Pipeline::new("two_sources")
        .add_extractor(CsvExtractor::new(&input))
        .add_extractor(CsvExtractor::new(&input))
        .add_loader(CsvLoader::new(&output));

    let err = pipeline.run(&Options::new()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<EtlError>(),
        Some(EtlError::TypeMismatch {
            expected: "table",
            found: "many"
        })
    ));
    assert!(!output.exists());

    Ok(())
}

#[tokio::test]
async fn test_extract_options_reach_every_source() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.psv");
    std::fs::write(&input, "id|code\n1|007\n")?;

    let mut pipeline = Pipeline::new("options").add_extractor(CsvExtractor::new(&input));
    let options = json!({"delimiter": "|", "infer_types": false});
    let data = pipeline.run(options.as_object().unwrap()).await?;

    let table = data.as_table()?;
    assert_eq!(table.get(0, "code"), Some(&json!("007")));

    Ok(())
}

/// Loader that counts how often it was connected and disconnected
struct CountingLoader {
    counts: Arc<Mutex<(usize, usize)>>,
}

#[async_trait::async_trait]
impl Loader for CountingLoader {
    fn name(&self) -> &str {
        "counting"
    }

    async fn connect(&mut self) -> Result<()> {
        self.counts.lock().unwrap().0 += 1;
        Ok(())
    }

    async fn load(&mut self, data: &Data, _options: &Options) -> Result<usize> {
        Ok(data.as_table()?.len())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.counts.lock().unwrap().1 += 1;
        Ok(())
    }
}

#[tokio::test]
async fn test_loader_released_after_type_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = sample_csv(temp_dir.path())?;
    let counts = Arc::new(Mutex::new((0, 0)));

    let mut pipeline = Pipeline::new("released")
        .add_extractor(CsvExtractor::new(&input))
        .add_transformer(|data: Data| -> Result<Data> {
            Ok(Data::Json(data.into_table()?.to_records()))
        })
        .add_loader(CountingLoader {
            counts: counts.clone(),
        });

    assert!(pipeline.run(&Options::new()).await.is_err());
    assert_eq!(*counts.lock().unwrap(), (1, 1));

    Ok(())
}

#[tokio::test]
async fn test_pipeline_without_transformers_passes_data_through() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = sample_csv(temp_dir.path())?;

    let mut pipeline = Pipeline::new("passthrough").add_extractor(CsvExtractor::new(&input));
    let data = pipeline.run(&Options::new()).await?;

    let table: &Table = data.as_table()?;
    assert_eq!(table.len(), 5);
    assert_eq!(table.get(4, "name"), Some(&Value::Null));

    Ok(())
}

#[tokio::test]
async fn test_cleaning_treats_markers_and_equal_numbers_alike() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = temp_dir.path().join("input.csv");
    std::fs::write(
        &input,
        "id,name,score\n1,alice,90\n1,alice,90.0\n2,NA,80\n3,null,70\n4,NaN,60\n5,,50\n",
    )?;

    let mut pipeline = Pipeline::new("markers")
        .add_extractor(CsvExtractor::new(&input))
        .add_transformer(
            TableTransformer::new()
                .drop_duplicates(None)
                .drop_nulls(Some(vec!["name"])),
        );
    let data = pipeline.run(&Options::new()).await?;

    assert_eq!(
        data.as_table()?.rows(),
        &[vec![json!(1), json!("alice"), json!(90)]]
    );

    Ok(())
}
