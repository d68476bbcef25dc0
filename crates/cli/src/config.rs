//! Configuration management for the CLI

use anyhow::{anyhow, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_USER_ID: u64 = 1;
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// CLI configuration file contents
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub user_id: Option<u64>,
    pub timezone: Option<String>,
    /// "table" or "json"
    pub default_format: Option<String>,
}

/// Settings after merging flags, environment and the config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub user_id: u64,
    pub timezone: String,
    pub format: OutputFormat,
}

impl Config {
    /// Load configuration from `path`, or the default location
    ///
    /// A missing file yields an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("infradash").join("config.json"))
    }

    /// Merge with command-line values; explicit values win
    pub fn resolve(
        &self,
        api_url: Option<String>,
        user_id: Option<u64>,
        timezone: Option<String>,
        format: Option<OutputFormat>,
    ) -> Result<Settings> {
        let format = match format {
            Some(format) => format,
            None => match self.default_format.as_deref() {
                Some(name) => OutputFormat::from_str(name, true)
                    .map_err(|_| anyhow!("Invalid default_format '{}' in config", name))?,
                None => OutputFormat::default(),
            },
        };

        Ok(Settings {
            api_url: api_url
                .or_else(|| self.api_url.clone())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            user_id: user_id.or(self.user_id).unwrap_or(DEFAULT_USER_ID),
            timezone: timezone
                .or_else(|| self.timezone.clone())
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("config.json"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_and_resolve() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"api_url":"http://dashboard:9000","user_id":7,"timezone":"Europe/Berlin","default_format":"json"}}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        let settings = config.resolve(None, None, None, None).unwrap();

        assert_eq!(settings.api_url, "http://dashboard:9000");
        assert_eq!(settings.user_id, 7);
        assert_eq!(settings.timezone, "Europe/Berlin");
        assert_eq!(settings.format, OutputFormat::Json);
    }

    #[test]
    fn test_flags_override_file() {
        let config = Config {
            api_url: Some("http://dashboard:9000".to_string()),
            user_id: Some(7),
            timezone: None,
            default_format: Some("json".to_string()),
        };

        let settings = config
            .resolve(
                Some("http://localhost:1234".to_string()),
                Some(3),
                None,
                Some(OutputFormat::Table),
            )
            .unwrap();

        assert_eq!(settings.api_url, "http://localhost:1234");
        assert_eq!(settings.user_id, 3);
        assert_eq!(settings.timezone, "UTC");
        assert_eq!(settings.format, OutputFormat::Table);
    }

    #[test]
    fn test_invalid_default_format() {
        let config = Config {
            default_format: Some("yaml".to_string()),
            ..Default::default()
        };
        assert!(config.resolve(None, None, None, None).is_err());
    }

    #[test]
    fn test_invalid_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"api_url = 3").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
