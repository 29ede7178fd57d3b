//! REST API extractor

use crate::client::{Auth, HttpSession};
use crate::error::EtlError;
use crate::etl::Extractor;
use crate::frame::{Data, Options, Table, merge_options, parse_options, render_cell};
use async_trait::async_trait;
use eyre::{Context, Result};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Request options, taken from the extractor config merged with call options
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RequestOptions {
    endpoint: String,
    method: String,
    params: Map<String, Value>,
    json: Option<Value>,
    records: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            method: "GET".to_string(),
            params: Map::new(),
            json: None,
            records: None,
        }
    }
}

/// Extractor for REST endpoints
///
/// `connect` opens an HTTP session carrying the configured headers and auth;
/// `extract` issues one request and returns the JSON response.
///
/// Options:
/// - `endpoint`: path joined onto the base URL (default: the base URL itself)
/// - `method`: HTTP method (default `GET`)
/// - `params`: object of query parameters
/// - `json`: request body
/// - `records`: JSON pointer to an array of objects; when set, the response
///   is converted into a table (`""` for the whole response)
///
/// # Example
/// ```no_run
/// use tabular_etl::client::Auth;
/// use tabular_etl::etl::Extractor;
/// use tabular_etl::sources::ApiExtractor;
/// use serde_json::json;
///
/// # async fn example() -> eyre::Result<()> {
/// let mut extractor = ApiExtractor::new("https://api.example.com")
///     .with_auth(Auth::Bearer("token".to_string()));
///
/// extractor.connect().await?;
/// let options = json!({"endpoint": "users", "records": "/data"});
/// let users = extractor.extract(options.as_object().unwrap()).await?;
/// extractor.disconnect().await?;
/// # Ok(())
/// # }
/// ```
pub struct ApiExtractor {
    base_url: String,
    headers: Vec<(String, String)>,
    auth: Auth,
    config: Options,
    session: Option<HttpSession>,
}

impl ApiExtractor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            headers: Vec::new(),
            auth: Auth::None,
            config: Options::new(),
            session: None,
        }
    }

    /// Add a header sent with every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Set default request options for this extractor
    pub fn with_config(mut self, config: Options) -> Self {
        self.config = config;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn fetch(&self, session: &HttpSession, options: &RequestOptions) -> Result<Value> {
        let method = Method::from_bytes(options.method.to_uppercase().as_bytes())
            .map_err(|_| EtlError::InvalidOption(format!("Unknown method: {}", options.method)))?;

        let query: Vec<(&str, String)> = options
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), render_cell(v)))
            .collect();

        let mut request = session.request(method, &options.endpoint)?;
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = &options.json {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", session.base_url()))?;

        let url = response.url().clone();
        let response = response
            .error_for_status()
            .with_context(|| format!("Request to {} returned an error status", url))?;

        let data: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))?;

        log::info!("Extracted data from {}", url);
        Ok(data)
    }
}

#[async_trait]
impl Extractor for ApiExtractor {
    fn name(&self) -> &str {
        "api"
    }

    async fn connect(&mut self) -> Result<()> {
        self.session = Some(HttpSession::open(&self.base_url, &self.headers, &self.auth)?);
        log::info!("Connected to API: {} (auth: {})", self.base_url, self.auth);
        Ok(())
    }

    async fn extract(&mut self, options: &Options) -> Result<Data> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| EtlError::NotConnected(format!("API {}", self.base_url)))?;
        let options: RequestOptions = parse_options(merge_options(&self.config, options))?;

        let data = self.fetch(session, &options).await?;

        match &options.records {
            None => Ok(Data::Json(data)),
            Some(pointer) => {
                let records = data.pointer(pointer).ok_or_else(|| {
                    EtlError::InvalidOption(format!("No records at '{}' in response", pointer))
                })?;
                let table = Table::from_records(records)?;
                log::info!("Converted {} records into a table", table.len());
                Ok(Data::Table(table))
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.session = None;
        log::info!("Disconnected from API");
        Ok(())
    }
}
