//! HTTP session for REST sources
//!
//! Wraps a `reqwest::Client` built with default headers and a base URL that
//! endpoint paths are joined onto.

use super::Auth;
use crate::error::EtlError;
use eyre::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use url::Url;

/// An open HTTP session against one base URL
///
/// # Example
/// ```no_run
/// use tabular_etl::client::{Auth, HttpSession};
/// use reqwest::Method;
///
/// # async fn example() -> eyre::Result<()> {
/// let session = HttpSession::open("https://api.example.com/v1", &[], &Auth::None)?;
/// assert_eq!(session.url_for("users")?.as_str(), "https://api.example.com/v1/users");
///
/// let response = session.request(Method::GET, "users")?.send().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct HttpSession {
    client: Client,
    base_url: String,
}

impl HttpSession {
    /// Build a client with the given default headers and auth
    ///
    /// # Errors
    /// Returns [`EtlError::Connection`] if the base URL is not a valid URL or
    /// a header is malformed
    pub fn open(base_url: &str, headers: &[(String, String)], auth: &Auth) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| EtlError::Connection(format!("Invalid base URL '{}': {}", base_url, e)))?;

        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| EtlError::Connection(format!("Invalid header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| EtlError::Connection(format!("Invalid header value: {}", e)))?;
            default_headers.insert(name, value);
        }
        if let Some((name, value)) = auth.header()? {
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(default_headers)
            .build()
            .with_context(|| "Failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join an endpoint onto the base URL with exactly one slash
    ///
    /// An empty endpoint addresses the base URL itself.
    pub fn url_for(&self, endpoint: &str) -> Result<Url> {
        let endpoint = endpoint.trim_start_matches('/');
        let url = if endpoint.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, endpoint)
        };
        Url::parse(&url).with_context(|| format!("Invalid request URL: {}", url))
    }

    /// Start a request to `endpoint`
    pub fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url_for(endpoint)?;
        log::debug!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }
}
