use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Documented fallback applied when no valid result limit is configured.
const DEFAULT_RESULT_LIMIT: u32 = 20;

const DEFAULT_API_URL: &str =
    "https://api.digitransit.fi/routing/v1/routers/hsl/index/graphql";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// GraphQL endpoint of the remote stop registry.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// How often the background loop refreshes the stop registry.
    #[serde(default = "default_sync_interval_hours")]
    pub sync_interval_hours: u64,
    /// Result budget for nearby/search queries when the request does not
    /// carry its own limit. Validated by `result_limit`.
    #[serde(default)]
    pub default_result_limit: Option<i64>,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_database_path() -> String {
    "data/stops.db".to_string()
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_sync_interval_hours() -> u64 {
    24
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_path: default_database_path(),
            api_url: default_api_url(),
            sync_interval_hours: default_sync_interval_hours(),
            default_result_limit: None,
            cors_origins: Vec::new(),
            cors_permissive: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// The validated default result limit. Anything other than a positive
    /// integer falls back to 20; the query layer itself never clamps.
    pub fn result_limit(&self) -> u32 {
        match self.default_result_limit {
            Some(value) if value > 0 => value as u32,
            Some(value) => {
                warn!(value, "Ignoring non-positive default_result_limit");
                DEFAULT_RESULT_LIMIT
            }
            None => DEFAULT_RESULT_LIMIT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.sync_interval_hours, 24);
        assert_eq!(config.result_limit(), 20);
        assert!(!config.cors_permissive);
    }

    #[test]
    fn configured_result_limit_is_used_when_positive() {
        let config: Config = serde_yaml::from_str("default_result_limit: 50").unwrap();
        assert_eq!(config.result_limit(), 50);
    }

    #[test]
    fn non_positive_result_limit_falls_back_to_default() {
        let config: Config = serde_yaml::from_str("default_result_limit: 0").unwrap();
        assert_eq!(config.result_limit(), 20);

        let config: Config = serde_yaml::from_str("default_result_limit: -3").unwrap();
        assert_eq!(config.result_limit(), 20);
    }
}
