//! SQL database loader (SQLite and PostgreSQL via `sqlx::any`)

use crate::error::EtlError;
use crate::etl::Loader;
use crate::frame::{Data, Options, Table, merge_options, parse_options, render_cell};
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use sqlx::any::{Any, AnyArguments, AnyPoolOptions};
use sqlx::{AnyConnection, AnyPool};
use sqlx::query::Query;

/// What to do when the target table already exists
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    Fail,
    Replace,
    #[default]
    Append,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoadOptions {
    if_exists: IfExists,
}

/// Database engine picked from the connection string scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            _ => Err(EtlError::Connection(format!(
                "Unsupported database scheme '{}' (expected sqlite or postgres)",
                scheme
            ))
            .into()),
        }
    }

    /// The `n`th (1-based) bind parameter
    fn placeholder(self, n: usize) -> String {
        match self {
            Self::Sqlite => "?".to_string(),
            Self::Postgres => format!("${}", n),
        }
    }

    fn sql_type(self, column: ColumnType) -> &'static str {
        match (self, column) {
            (Self::Sqlite, ColumnType::Boolean | ColumnType::Integer) => "INTEGER",
            (Self::Sqlite, ColumnType::Real) => "REAL",
            (Self::Postgres, ColumnType::Boolean) => "BOOLEAN",
            (Self::Postgres, ColumnType::Integer) => "BIGINT",
            (Self::Postgres, ColumnType::Real) => "DOUBLE PRECISION",
            (_, ColumnType::Text) => "TEXT",
        }
    }

    fn table_exists_sql(self) -> &'static str {
        match self {
            Self::Sqlite => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
            Self::Postgres => {
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1"
            }
        }
    }
}

/// Column type inferred from the cells, ordered from narrowest to widest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ColumnType {
    Boolean,
    Integer,
    Real,
    Text,
}

/// Loader that writes a table into a SQL table
///
/// The connection string scheme picks the engine: `sqlite://path` (the file
/// is created when missing), `sqlite::memory:` or `postgres://...`.
///
/// The table is created when absent, with column types inferred from the
/// data. By default rows are appended to an existing table; the `if_exists`
/// option (`append`, `replace`, `fail`) changes that. All rows of one load go
/// in a single transaction.
///
/// # Example
/// ```no_run
/// use tabular_etl::etl::Loader;
/// use tabular_etl::frame::{Data, Options, Table};
/// use tabular_etl::sinks::DatabaseLoader;
///
/// # async fn example(table: Table) -> eyre::Result<()> {
/// let mut loader = DatabaseLoader::new("sqlite://warehouse.db", "scores");
/// loader.connect().await?;
/// loader.load(&Data::Table(table), &Options::new()).await?;
/// loader.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct DatabaseLoader {
    connection_string: String,
    table_name: String,
    config: Options,
    pool: Option<(AnyPool, Backend)>,
}

impl DatabaseLoader {
    pub fn new(connection_string: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            table_name: table_name.into(),
            config: Options::new(),
            pool: None,
        }
    }

    /// Set default load options for this loader
    pub fn with_config(mut self, config: Options) -> Self {
        self.config = config;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn table_exists(&self, conn: &mut AnyConnection, backend: Backend) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(backend.table_exists_sql())
            .bind(self.table_name.clone())
            .fetch_one(conn)
            .await
            .context("Failed to look up target table")?;
        Ok(count > 0)
    }

    async fn create_table(
        &self,
        conn: &mut AnyConnection,
        backend: Backend,
        table: &Table,
    ) -> Result<()> {
        let sql = create_sql(backend, &self.table_name, &column_types(table)?, table.columns());
        log::debug!("{}", sql);
        sqlx::query(&sql)
            .execute(conn)
            .await
            .with_context(|| format!("Failed to create table '{}'", self.table_name))?;
        Ok(())
    }
}

#[async_trait]
impl Loader for DatabaseLoader {
    fn name(&self) -> &str {
        "database"
    }

    async fn connect(&mut self) -> Result<()> {
        let backend = Backend::from_url(&self.connection_string)?;
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(&connect_url(&self.connection_string, backend))
            .await
            .map_err(|e| EtlError::Connection(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| EtlError::Connection(e.to_string()))?;

        self.pool = Some((pool, backend));
        log::info!("Connected to {:?} database", backend);
        Ok(())
    }

    async fn load(&mut self, data: &Data, options: &Options) -> Result<usize> {
        let table = data.as_table()?;
        let options: LoadOptions = parse_options(merge_options(&self.config, options))?;
        let (pool, backend) = self
            .pool
            .as_ref()
            .ok_or_else(|| EtlError::NotConnected(format!("database table '{}'", self.table_name)))?;
        let backend = *backend;

        if table.columns().is_empty() {
            eyre::bail!("Cannot load a table without columns into '{}'", self.table_name);
        }

        let mut tx = pool.begin().await.context("Failed to start transaction")?;

        let exists = self.table_exists(&mut tx, backend).await?;
        match (exists, options.if_exists) {
            (true, IfExists::Fail) => {
                return Err(EtlError::TableExists(self.table_name.clone()).into());
            }
            (true, IfExists::Replace) => {
                let sql = format!("DROP TABLE {}", quote_ident(&self.table_name));
                sqlx::query(&sql)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to drop table '{}'", self.table_name))?;
                self.create_table(&mut tx, backend, table).await?;
            }
            (true, IfExists::Append) => {}
            (false, _) => self.create_table(&mut tx, backend, table).await?,
        }

        let types = column_types(table)?;
        let insert = insert_sql(backend, &self.table_name, table.columns());
        for row in table.rows() {
            let query = row
                .iter()
                .zip(&types)
                .fold(sqlx::query(&insert), |query, (cell, &ty)| bind_cell(query, cell, ty));
            query
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to insert into '{}'", self.table_name))?;
        }

        tx.commit().await.context("Failed to commit transaction")?;

        log::info!("Loaded {} rows to table '{}'", table.len(), self.table_name);
        Ok(table.len())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some((pool, _)) = self.pool.take() {
            pool.close().await;
        }
        log::info!("Database connection closed");
        Ok(())
    }
}

/// SQLite file URLs open in read-write-create mode unless a mode is given
fn connect_url(url: &str, backend: Backend) -> String {
    match backend {
        Backend::Sqlite if !url.contains(":memory:") && !url.contains("mode=") => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{}{}mode=rwc", url, separator)
        }
        _ => url.to_string(),
    }
}

fn column_types(table: &Table) -> Result<Vec<ColumnType>> {
    table
        .columns()
        .iter()
        .map(|name| Ok(column_type(&table.column(name)?)))
        .collect()
}

/// Widest type over the non-null cells; all-null columns are text
fn column_type(cells: &[&Value]) -> ColumnType {
    cells
        .iter()
        .filter_map(|cell| match cell {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Number(n) if n.is_i64() => Some(ColumnType::Integer),
            Value::Number(_) => Some(ColumnType::Real),
            _ => Some(ColumnType::Text),
        })
        .max()
        .unwrap_or(ColumnType::Text)
}

fn create_sql(backend: Backend, table: &str, types: &[ColumnType], columns: &[String]) -> String {
    let columns = columns
        .iter()
        .zip(types)
        .map(|(name, &ty)| format!("{} {}", quote_ident(name), backend.sql_type(ty)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({})", quote_ident(table), columns)
}

fn insert_sql(backend: Backend, table: &str, columns: &[String]) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|n| backend.placeholder(n))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names,
        placeholders
    )
}

/// Bind a cell converted to its column's type, so every backend sees one type per column
fn bind_cell<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    cell: &Value,
    column: ColumnType,
) -> Query<'q, Any, AnyArguments<'q>> {
    match (column, cell) {
        (ColumnType::Boolean, Value::Null) => query.bind(None::<bool>),
        (ColumnType::Integer, Value::Null) => query.bind(None::<i64>),
        (ColumnType::Real, Value::Null) => query.bind(None::<f64>),
        (ColumnType::Text, Value::Null) => query.bind(None::<String>),
        (ColumnType::Boolean, Value::Bool(b)) => query.bind(*b),
        (ColumnType::Integer, Value::Bool(b)) => query.bind(i64::from(*b)),
        (ColumnType::Integer, Value::Number(n)) => query.bind(n.as_i64()),
        (ColumnType::Real, Value::Bool(b)) => query.bind(f64::from(u8::from(*b))),
        (ColumnType::Real, Value::Number(n)) => query.bind(n.as_f64()),
        // Text columns, and nested values stored as their JSON text
        (_, other) => query.bind(render_cell(other)),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    fn scores() -> Data {
        Table::from_rows(
            vec!["id", "name", "score"],
            vec![
                vec![json!(1), json!("alice"), json!(85.5)],
                vec![json!(2), Value::Null, json!(90)],
            ],
        )
        .unwrap()
        .into()
    }

    fn url(temp: &TempDir) -> String {
        format!("sqlite://{}", temp.path().join("test.db").display())
    }

    async fn read_back(url: &str) -> Vec<(i64, Option<String>, f64)> {
        let pool = SqlitePool::connect(url).await.unwrap();
        let rows = sqlx::query_as("SELECT id, name, score FROM scores ORDER BY rowid")
            .fetch_all(&pool)
            .await
            .unwrap();
        pool.close().await;
        rows
    }

    #[tokio::test]
    async fn test_creates_then_appends() {
        let temp = TempDir::new().unwrap();
        let mut loader = DatabaseLoader::new(url(&temp), "scores");

        loader.connect().await.unwrap();
        assert!(loader.is_connected());
        assert_eq!(loader.load(&scores(), &Options::new()).await.unwrap(), 2);
        loader.load(&scores(), &Options::new()).await.unwrap();
        loader.disconnect().await.unwrap();
        assert!(!loader.is_connected());

        let rows = read_back(&url(&temp)).await;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], (1, Some("alice".to_string()), 85.5));
        assert_eq!(rows[1], (2, None, 90.0));
    }

    #[tokio::test]
    async fn test_replace_and_fail() {
        let temp = TempDir::new().unwrap();
        let mut loader = DatabaseLoader::new(url(&temp), "scores");
        loader.connect().await.unwrap();
        loader.load(&scores(), &Options::new()).await.unwrap();

        let replace = json!({"if_exists": "replace"});
        loader
            .load(&scores(), replace.as_object().unwrap())
            .await
            .unwrap();

        let fail = json!({"if_exists": "fail"});
        let err = loader
            .load(&scores(), fail.as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::TableExists(t)) if t == "scores"
        ));
        loader.disconnect().await.unwrap();

        assert_eq!(read_back(&url(&temp)).await.len(), 2);
    }

    #[tokio::test]
    async fn test_requires_connect() {
        let mut loader = DatabaseLoader::new("sqlite::memory:", "scores");
        let err = loader.load(&scores(), &Options::new()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::NotConnected(_))
        ));
        loader.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_non_tabular_input_fails_before_writing() {
        let mut loader = DatabaseLoader::new("sqlite::memory:", "scores");
        loader.connect().await.unwrap();
        let err = loader
            .load(&Data::Json(json!([{"id": 1}])), &Options::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::TypeMismatch { .. })
        ));
        loader.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_database() {
        let temp = TempDir::new().unwrap();
        let bad = format!(
            "sqlite://{}",
            temp.path().join("missing/dir/test.db").display()
        );
        let mut loader = DatabaseLoader::new(bad, "scores");
        let err = loader.connect().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::Connection(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_scheme() {
        let mut loader = DatabaseLoader::new("mysql://localhost/warehouse", "scores");
        let err = loader.connect().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::Connection(msg)) if msg.contains("mysql")
        ));
        assert!(!loader.is_connected());
    }

    #[tokio::test]
    async fn test_booleans_and_mixed_numbers() {
        let temp = TempDir::new().unwrap();
        let table = Table::from_rows(
            vec!["flag", "amount"],
            vec![
                vec![json!(true), json!(3)],
                vec![Value::Null, json!(2.5)],
            ],
        )
        .unwrap();

        let mut loader = DatabaseLoader::new(url(&temp), "flags");
        loader.connect().await.unwrap();
        loader.load(&table.into(), &Options::new()).await.unwrap();
        loader.disconnect().await.unwrap();

        let pool = SqlitePool::connect(&url(&temp)).await.unwrap();
        let rows: Vec<(Option<i64>, f64)> =
            sqlx::query_as("SELECT flag, amount FROM flags ORDER BY rowid")
                .fetch_all(&pool)
                .await
                .unwrap();
        pool.close().await;
        assert_eq!(rows, vec![(Some(1), 3.0), (None, 2.5)]);
    }

    #[test]
    fn test_backend_from_url() {
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert_eq!(Backend::from_url("sqlite://data/etl.db").unwrap(), Backend::Sqlite);
        assert_eq!(
            Backend::from_url("postgres://etl@localhost/warehouse").unwrap(),
            Backend::Postgres
        );
        assert_eq!(
            Backend::from_url("PostgreSQL://localhost/warehouse").unwrap(),
            Backend::Postgres
        );
        assert!(Backend::from_url("warehouse.db").is_err());
    }

    #[test]
    fn test_sqlite_urls_create_missing_files() {
        assert_eq!(
            connect_url("sqlite://out/etl.db", Backend::Sqlite),
            "sqlite://out/etl.db?mode=rwc"
        );
        assert_eq!(
            connect_url("sqlite://out/etl.db?mode=ro", Backend::Sqlite),
            "sqlite://out/etl.db?mode=ro"
        );
        assert_eq!(connect_url("sqlite::memory:", Backend::Sqlite), "sqlite::memory:");
        assert_eq!(
            connect_url("postgres://localhost/db", Backend::Postgres),
            "postgres://localhost/db"
        );
    }

    #[test]
    fn test_statements_per_backend() {
        let columns = vec!["id".to_string(), "score".to_string(), "ok".to_string()];
        let types = [ColumnType::Integer, ColumnType::Real, ColumnType::Boolean];

        assert_eq!(
            create_sql(Backend::Sqlite, "scores", &types, &columns),
            "CREATE TABLE \"scores\" (\"id\" INTEGER, \"score\" REAL, \"ok\" INTEGER)"
        );
        assert_eq!(
            create_sql(Backend::Postgres, "scores", &types, &columns),
            "CREATE TABLE \"scores\" (\"id\" BIGINT, \"score\" DOUBLE PRECISION, \"ok\" BOOLEAN)"
        );
        assert_eq!(
            insert_sql(Backend::Sqlite, "scores", &columns),
            "INSERT INTO \"scores\" (\"id\", \"score\", \"ok\") VALUES (?, ?, ?)"
        );
        assert_eq!(
            insert_sql(Backend::Postgres, "scores", &columns),
            "INSERT INTO \"scores\" (\"id\", \"score\", \"ok\") VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn test_column_type_inference() {
        assert_eq!(column_type(&[&json!(1), &Value::Null]), ColumnType::Integer);
        assert_eq!(column_type(&[&json!(1), &json!(2.5)]), ColumnType::Real);
        assert_eq!(column_type(&[&json!(1), &json!("x")]), ColumnType::Text);
        assert_eq!(column_type(&[&Value::Null]), ColumnType::Text);
        assert_eq!(column_type(&[&json!(true)]), ColumnType::Boolean);
        assert_eq!(column_type(&[&json!(true), &json!(2)]), ColumnType::Integer);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("score"), "\"score\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
