use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AppError;

const DEFAULT_ENDPOINT: &str = "http://ec2-54-81-142-28.compute-1.amazonaws.com:8080/predict";
pub const ENDPOINT_ENV: &str = "DIGIT_LENS_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    pub required_width: u32,
    pub required_height: u32,
    pub history_key: String,
    pub database_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            required_width: 28,
            required_height: 28,
            history_key: "requests_log_v1".to_string(),
            database_file: "history.sqlite3".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `config.json` from `dir` when present, then applies the
    /// endpoint override from the environment.
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        let mut config = Self::from_file(&dir.join("config.json"))?;
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            config.apply_endpoint_override(endpoint);
        }
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| AppError {
            message: format!("Failed to read config from {}: {}", path.display(), e),
        })?;

        Ok(serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!("Ignoring unreadable config {}: {}", path.display(), e);
            Self::default()
        }))
    }

    fn apply_endpoint_override(&mut self, endpoint: String) {
        let endpoint = endpoint.trim();
        if !endpoint.is_empty() {
            self.endpoint = endpoint.to_string();
        }
    }

    pub fn size_matches(&self, width: u32, height: u32) -> bool {
        width == self.required_width && height == self.required_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.size_matches(28, 28));
        assert!(!config.size_matches(10, 10));
    }

    #[test]
    fn file_overrides_only_the_fields_it_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "endpoint": "http://localhost:8080/predict" }"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.endpoint, "http://localhost:8080/predict");
        assert_eq!(config.required_width, 28);
        assert_eq!(config.history_key, "requests_log_v1");
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::from_file(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn endpoint_env_wins_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{ "endpoint": "http://from-file/predict", "required_width": 32 }"#,
        )
        .unwrap();

        std::env::set_var(ENDPOINT_ENV, "http://from-env/predict");
        let loaded = AppConfig::load(dir.path());
        std::env::remove_var(ENDPOINT_ENV);

        let config = loaded.unwrap();
        assert_eq!(config.endpoint, "http://from-env/predict");
        assert_eq!(config.required_width, 32);
    }

    #[test]
    fn blank_endpoint_override_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_endpoint_override("   ".into());
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        config.apply_endpoint_override(" http://10.0.0.2/predict ".into());
        assert_eq!(config.endpoint, "http://10.0.0.2/predict");
    }
}
