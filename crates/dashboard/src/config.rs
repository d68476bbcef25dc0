//! Dashboard server configuration

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration, read from `DASHBOARD_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Instance name attached to structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port serving payloads, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// JSON fixture loaded into the in-memory store
    #[serde(default = "default_fixture_path")]
    pub fixture_path: PathBuf,

    /// Fixed "now" for the trailing window, for demos against static fixtures
    #[serde(default)]
    pub pinned_now: Option<DateTime<Utc>>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "infra-dashboard".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_fixture_path() -> PathBuf {
    PathBuf::from("fixtures/sample_inventory.json")
}

impl DashboardConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("DASHBOARD").try_parsing(true))
            .build()?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("invalid DASHBOARD_* configuration")
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.api_port)
    }
}
