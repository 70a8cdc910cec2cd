//! Connection settings for the wallabag instance, read from a JSON file.
//!
//! Search order when no path is given: ./config.json, then
//! $XDG_CONFIG_HOME/kindlebag/config.json (or ~/.config/kindlebag/config.json).

use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Config file contents. Key names follow the layout shared by other wallabag tools.
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "WallabagURL")]
    pub wallabag_url: String,
    #[serde(rename = "ClientId")]
    pub client_id: String,
    #[serde(rename = "ClientSecret")]
    pub client_secret: String,
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "UserPassword")]
    pub user_password: String,
    /// HTTP User-Agent header.
    #[serde(rename = "UserAgent", default)]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(rename = "TimeoutSecs", default)]
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("wallabag_url", &self.wallabag_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_name", &self.user_name)
            .field("user_password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config file found (looked in: {})", format_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config {path}: {field} must not be empty")]
    MissingField { path: PathBuf, field: &'static str },

    #[error("Invalid config {path}: WallabagURL '{url}': {reason}")]
    InvalidUrl {
        path: PathBuf,
        url: String,
        reason: String,
    },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Config {
    /// Base URL without trailing slash, e.g. `https://bag.example.com`.
    pub fn base_url(&self) -> &str {
        self.wallabag_url.trim_end_matches('/')
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let required = [
            ("WallabagURL", &self.wallabag_url),
            ("ClientId", &self.client_id),
            ("ClientSecret", &self.client_secret),
            ("UserName", &self.user_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    path: path.to_path_buf(),
                    field,
                });
            }
        }
        let invalid = |reason: String| ConfigError::InvalidUrl {
            path: path.to_path_buf(),
            url: self.wallabag_url.clone(),
            reason,
        };
        let url = Url::parse(self.base_url()).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid(format!(
                "unsupported scheme '{}', expected http or https",
                url.scheme()
            )));
        }
        Ok(())
    }
}

/// Read and validate the config at `path`.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: Config = serde_json::from_str(&s).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate(path)?;
    Ok(config)
}

/// Candidate paths searched when no config path is given on the command line.
pub fn default_config_paths() -> Result<Vec<PathBuf>, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::Read {
        path: PathBuf::from("."),
        source: e,
    })?;
    let mut paths = vec![cwd.join(DEFAULT_CONFIG_FILE)];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("kindlebag").join(DEFAULT_CONFIG_FILE));
    }
    Ok(paths)
}

/// Load the config. An explicit path is used as is; otherwise the first existing
/// default path wins. Returns the path actually read alongside the config.
pub fn load_config(explicit: Option<&Path>) -> Result<(PathBuf, Config), ConfigError> {
    if let Some(path) = explicit {
        return read_config(path).map(|c| (path.to_path_buf(), c));
    }
    let paths = default_config_paths()?;
    match paths.iter().find(|p| p.exists()) {
        Some(path) => read_config(path).map(|c| (path.clone(), c)),
        None => Err(ConfigError::NotFound { searched: paths }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    const FULL: &str = r#"{
        "WallabagURL": "https://bag.example.com/",
        "ClientId": "1_abc",
        "ClientSecret": "s3cret",
        "UserName": "reader",
        "UserPassword": "hunter2",
        "UserAgent": "kindlebag-test/1.0",
        "TimeoutSecs": 60
    }"#;

    fn write_config(dir: &Path, contents: &str) -> Result<PathBuf, Box<dyn Error>> {
        let path = dir.join("config.json");
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    #[test]
    fn parse_full_config() -> Result<(), Box<dyn Error>> {
        let c: Config = serde_json::from_str(FULL)?;
        assert_eq!(c.wallabag_url, "https://bag.example.com/");
        assert_eq!(c.base_url(), "https://bag.example.com");
        assert_eq!(c.client_id, "1_abc");
        assert_eq!(c.client_secret, "s3cret");
        assert_eq!(c.user_name, "reader");
        assert_eq!(c.user_password, "hunter2");
        assert_eq!(c.user_agent.as_deref(), Some("kindlebag-test/1.0"));
        assert_eq!(c.timeout_secs, Some(60));
        Ok(())
    }

    #[test]
    fn optional_keys_default_to_none() -> Result<(), Box<dyn Error>> {
        let c: Config = serde_json::from_str(
            r#"{"WallabagURL": "http://localhost:8080", "ClientId": "a",
                "ClientSecret": "b", "UserName": "c", "UserPassword": "d"}"#,
        )?;
        assert!(c.user_agent.is_none());
        assert!(c.timeout_secs.is_none());
        Ok(())
    }

    #[test]
    fn debug_output_redacts_secrets() -> Result<(), Box<dyn Error>> {
        let c: Config = serde_json::from_str(FULL)?;
        let shown = format!("{:?}", c);
        assert!(shown.contains("reader"));
        assert!(!shown.contains("s3cret"));
        assert!(!shown.contains("hunter2"));
        Ok(())
    }

    #[test]
    fn read_config_from_explicit_path() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(dir.path(), FULL)?;
        let (used, c) = load_config(Some(&path))?;
        assert_eq!(used, path);
        assert_eq!(c.user_name, "reader");
        Ok(())
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let path = PathBuf::from("/nonexistent_dir_kindlebag_xyz/config.json");
        match load_config(Some(&path)) {
            Err(ConfigError::Read { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Read error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_json_is_parse_error() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(dir.path(), r#"{"WallabagURL": "#)?;
        assert!(matches!(read_config(&path), Err(ConfigError::Parse { .. })));
        Ok(())
    }

    #[test]
    fn missing_key_is_parse_error() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(dir.path(), r#"{"WallabagURL": "https://bag.example.com"}"#)?;
        let err = read_config(&path).unwrap_err();
        assert!(err.to_string().contains("ClientId"), "{}", err);
        Ok(())
    }

    #[test]
    fn empty_client_id_is_rejected() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(
            dir.path(),
            r#"{"WallabagURL": "https://bag.example.com", "ClientId": " ",
                "ClientSecret": "b", "UserName": "c", "UserPassword": "d"}"#,
        )?;
        match read_config(&path) {
            Err(ConfigError::MissingField { field, .. }) => assert_eq!(field, "ClientId"),
            other => panic!("expected MissingField, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn non_http_url_is_rejected() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(
            dir.path(),
            r#"{"WallabagURL": "ftp://bag.example.com", "ClientId": "a",
                "ClientSecret": "b", "UserName": "c", "UserPassword": "d"}"#,
        )?;
        assert!(matches!(
            read_config(&path),
            Err(ConfigError::InvalidUrl { .. })
        ));
        Ok(())
    }

    #[test]
    fn relative_url_is_rejected() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_config(
            dir.path(),
            r#"{"WallabagURL": "bag.example.com", "ClientId": "a",
                "ClientSecret": "b", "UserName": "c", "UserPassword": "d"}"#,
        )?;
        assert!(matches!(
            read_config(&path),
            Err(ConfigError::InvalidUrl { .. })
        ));
        Ok(())
    }

    #[test]
    fn not_found_lists_searched_paths() {
        let err = ConfigError::NotFound {
            searched: vec![PathBuf::from("a/config.json"), PathBuf::from("b/config.json")],
        };
        assert_eq!(
            err.to_string(),
            "No config file found (looked in: a/config.json, b/config.json)"
        );
    }
}
