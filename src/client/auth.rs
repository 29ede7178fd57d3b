use base64::Engine;
use eyre::Result;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use std::str::FromStr;

/// Authentication for REST sources
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Auth {
    /// Use an API key via `Authorization: ApiKey <key>`
    Apikey(String),
    /// Use a bearer token via `Authorization: Bearer <token>`
    Bearer(String),
    /// Use username and password authentication via Basic Auth headers
    Basic(String, String),
    /// Don't use any authentication
    #[default]
    None,
}

impl Auth {
    pub fn new(
        r#type: &AuthType,
        username: Option<String>,
        password: Option<String>,
        token: Option<String>,
    ) -> Self {
        match (r#type, username, password, token) {
            (AuthType::Apikey, _, _, Some(key)) => Self::Apikey(key),
            (AuthType::Bearer, _, _, Some(token)) => Self::Bearer(token),
            (AuthType::Basic, Some(username), Some(password), _) => Self::Basic(username, password),
            _ => Self::None,
        }
    }

    /// The `Authorization` header value, if any
    pub fn header(&self) -> Result<Option<(reqwest::header::HeaderName, HeaderValue)>> {
        let value = match self {
            Self::Apikey(key) => format!("ApiKey {}", key),
            Self::Bearer(token) => format!("Bearer {}", token),
            Self::Basic(username, password) => {
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                format!("Basic {}", credentials)
            }
            Self::None => return Ok(None),
        };
        let mut value = HeaderValue::from_str(&value)?;
        value.set_sensitive(true);
        Ok(Some((AUTHORIZATION, value)))
    }
}

impl std::fmt::Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apikey(_) => write!(f, "Apikey"),
            Self::Bearer(_) => write!(f, "Bearer"),
            Self::Basic(_, _) => write!(f, "Basic"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Auth scheme named in a pipeline config, parsed with `FromStr`
#[derive(Clone, Debug)]
pub enum AuthType {
    Apikey,
    Bearer,
    Basic,
    None,
}

impl FromStr for AuthType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apikey" => Ok(Self::Apikey),
            "bearer" => Ok(Self::Bearer),
            "basic" => Ok(Self::Basic),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_header() {
        let auth = Auth::Basic("user".to_string(), "pass".to_string());
        let (name, value) = auth.header().unwrap().unwrap();
        assert_eq!(name, AUTHORIZATION);
        assert_eq!(value.to_str().unwrap(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn test_no_auth_has_no_header() {
        assert!(Auth::None.header().unwrap().is_none());
    }

    #[test]
    fn test_auth_type_from_str() {
        assert!(matches!("apikey".parse::<AuthType>(), Ok(AuthType::Apikey)));
        assert!(matches!("Bearer".parse::<AuthType>(), Ok(AuthType::Bearer)));
        assert!(matches!("basic".parse::<AuthType>(), Ok(AuthType::Basic)));
        assert!(matches!("none".parse::<AuthType>(), Ok(AuthType::None)));
        assert!("kerberos".parse::<AuthType>().is_err());
    }

    #[test]
    fn test_new_falls_back_to_none() {
        let auth = Auth::new(&AuthType::Basic, Some("user".to_string()), None, None);
        assert_eq!(auth, Auth::None);
        assert_eq!(
            Auth::new(&AuthType::Bearer, None, None, Some("t".to_string())),
            Auth::Bearer("t".to_string())
        );
        assert!(matches!("APIKEY".parse::<AuthType>(), Ok(AuthType::Apikey)));
    }
}
