//! Configuration loading
//!
//! A configuration is a plain string-keyed map read from an optional JSON or
//! YAML file, then overridden by environment variables that share a prefix.
//! There is no schema: components pick the keys they understand.

use crate::frame::Options;
use eyre::{Context, Result};
use serde_json::{Number, Value};
use std::path::Path;

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "ETL_";

/// Load configuration from a file and the process environment
///
/// The file is optional: `None` or a path that does not exist yields an
/// empty base. `.yml`/`.yaml` files are parsed as YAML, anything else as
/// JSON. Every environment variable starting with `env_prefix` then
/// overrides the file: the prefix is stripped, the key lowercased and the
/// value coerced with [`parse_env_value`].
///
/// # Example
/// ```no_run
/// use tabular_etl::config::{ENV_PREFIX, load_config};
/// use std::path::Path;
///
/// # fn example() -> eyre::Result<()> {
/// // ETL_BATCH_SIZE=500 in the environment becomes {"batch_size": 500}
/// let config = load_config(Some(Path::new("pipeline.json")), ENV_PREFIX)?;
/// println!("{:?}", config.get("batch_size"));
/// # Ok(())
/// # }
/// ```
pub fn load_config(config_path: Option<&Path>, env_prefix: &str) -> Result<Options> {
    let mut config = match config_path {
        Some(path) if path.exists() => read_config_file(path)?,
        Some(path) => {
            log::debug!("Config file {} not found, using environment only", path.display());
            Options::new()
        }
        None => Options::new(),
    };

    merge_env(&mut config, std::env::vars(), env_prefix);
    Ok(config)
}

/// Read a JSON or YAML config file into a map
pub fn read_config_file(path: &Path) -> Result<Options> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    );

    let value: Value = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Options::new()),
        _ => eyre::bail!("Config file must contain a mapping: {}", path.display()),
    }
}

/// Apply `prefix`-ed variables from `vars` over `config`
pub fn merge_env<I>(config: &mut Options, vars: I, prefix: &str)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(prefix) {
            let config_key = stripped.to_lowercase();
            log::debug!("Config override from environment: {}", config_key);
            config.insert(config_key, parse_env_value(&value));
        }
    }
}

/// Coerce an environment value
///
/// Tries, in order: a JSON literal, a boolean (any case), an integer, a
/// float, and finally falls back to the raw string.
pub fn parse_env_value(value: &str) -> Value {
    if let Ok(parsed) = serde_json::from_str::<Value>(value) {
        return parsed;
    }

    match value.to_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(i) = value.trim().parse::<i64>() {
        return Value::from(i);
    }

    if let Some(n) = value.trim().parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }

    Value::String(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_env_value() {
        assert_eq!(parse_env_value("{\"a\": [1, 2]}"), json!({"a": [1, 2]}));
        assert_eq!(parse_env_value("true"), json!(true));
        assert_eq!(parse_env_value("False"), json!(false));
        assert_eq!(parse_env_value("42"), json!(42));
        assert_eq!(parse_env_value("007"), json!(7));
        assert_eq!(parse_env_value("2.5"), json!(2.5));
        assert_eq!(parse_env_value(".5"), json!(0.5));
        assert_eq!(parse_env_value("hello"), json!("hello"));
        assert_eq!(parse_env_value("nan"), json!("nan"));
    }

    #[test]
    fn test_env_wins_over_file() {
        let mut config = json!({"batch_size": 10, "name": "file"})
            .as_object()
            .unwrap()
            .clone();

        merge_env(
            &mut config,
            vars(&[
                ("ETL_BATCH_SIZE", "500"),
                ("ETL_DEBUG", "TRUE"),
                ("OTHER_NAME", "ignored"),
            ]),
            ENV_PREFIX,
        );

        assert_eq!(config["batch_size"], json!(500));
        assert_eq!(config["debug"], json!(true));
        assert_eq!(config["name"], json!("file"));
        assert!(!config.contains_key("other_name"));
    }

    #[test]
    fn test_read_json_and_yaml_files() {
        let temp = TempDir::new().unwrap();
        let json_path = temp.path().join("config.json");
        std::fs::write(&json_path, r#"{"source": "input.csv", "limit": 3}"#).unwrap();
        let yaml_path = temp.path().join("config.yaml");
        std::fs::write(&yaml_path, "source: input.csv\nlimit: 3\n").unwrap();

        let from_json = read_config_file(&json_path).unwrap();
        let from_yaml = read_config_file(&yaml_path).unwrap();
        assert_eq!(from_json, from_yaml);
        assert_eq!(from_json["limit"], json!(3));
    }

    #[test]
    fn test_non_mapping_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(read_config_file(&path).is_err());
    }

    #[test]
    #[serial]
    fn test_load_config_from_process_env() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"retries": 1, "mode": "overwrite"}"#).unwrap();

        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::set_var("TETL_TEST_RETRIES", "5") };
        let config = load_config(Some(&path), "TETL_TEST_").unwrap();
        unsafe { std::env::remove_var("TETL_TEST_RETRIES") };

        assert_eq!(config["retries"], json!(5));
        assert_eq!(config["mode"], json!("overwrite"));
    }

    #[test]
    #[serial]
    fn test_missing_file_is_ignored() {
        let config = load_config(Some(Path::new("/nonexistent/config.json")), "TETL_NONE_").unwrap();
        assert!(config.is_empty());
    }
}
