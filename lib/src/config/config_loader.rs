// lib/src/config/config_loader.rs
// Layering: built-in defaults, then the optional YAML file, then environment
// variables. CLI flags are applied last by the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dotenv::dotenv;
use log::{debug, error, info, warn};
use serde_yaml2 as serde_yaml;

use crate::config::config_defaults::{default_admin_password, default_jwt_secret, DEFAULT_CONFIG_FILE_ENV};
use crate::config::config_structs::{AppConfig, AppEnvironment};
use crate::errors::StrokeError;

impl AppConfig {
    /// Loads configuration from `path` (or `$STROKE_CONFIG`, after reading
    /// any `.env` file), applies environment overrides and validates the
    /// result. A missing file is not an error; defaults are used instead.
    pub async fn load(path: Option<&Path>) -> Result<AppConfig> {
        if let Ok(env_file) = dotenv() {
            debug!("Loaded environment from {:?}", env_file);
        }
        let path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(DEFAULT_CONFIG_FILE_ENV).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) if path.exists() => {
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .context(format!("Failed to read config file: {}", path.display()))?;
                let config = AppConfig::from_yaml_str(&content)
                    .context(format!("Failed to parse YAML config from {}", path.display()))
                    .map_err(|e| {
                        error!("Deserialization error: {:?}", e);
                        e
                    })?;
                info!("Loaded configuration from {:?}", path);
                config
            }
            Some(path) => {
                warn!("Config file not found at {:?}, using defaults", path);
                AppConfig::default()
            }
            None => {
                info!("No config file given, using defaults");
                AppConfig::default()
            }
        };

        config
            .apply_env_with(|key| std::env::var(key).ok())
            .context("Invalid environment override")?;
        let config = config.validate()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<AppConfig> {
        if content.trim().is_empty() {
            return Ok(AppConfig::default());
        }
        let config: AppConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), StrokeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("APP_ENV") {
            self.environment = env.parse().map_err(StrokeError::ConfigurationError)?;
        }
        // JWT_SECRET_KEY wins over SECRET_KEY when both are set.
        if let Some(secret) = lookup("JWT_SECRET_KEY").or_else(|| lookup("SECRET_KEY")) {
            self.auth.jwt_secret = secret;
        }
        if let Some(url) = lookup("API_BASE_URL") {
            if !self.server.cors_origins.contains(&url) {
                self.server.cors_origins.push(url.clone());
            }
            self.server.public_base_url = Some(url);
        }
        if let Some(host) = lookup("STROKE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("STROKE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| StrokeError::ConfigurationError(format!("STROKE_PORT is not a port: {}", port)))?;
        }
        if let Some(dir) = lookup("STROKE_DATA_DIR") {
            self.storage.data_directory = PathBuf::from(dir);
        }
        if let Some(model) = lookup("STROKE_MODEL_PATH") {
            self.model.artifact_path = PathBuf::from(model);
        }
        if let Some(offset) = lookup("STROKE_UTC_OFFSET_MINUTES") {
            self.dashboard.utc_offset_minutes = offset.parse().map_err(|_| {
                StrokeError::ConfigurationError(format!(
                    "STROKE_UTC_OFFSET_MINUTES is not an integer: {}",
                    offset
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(self) -> Result<Self, StrokeError> {
        let risk = &self.risk;
        if !(risk.medium_threshold > 0.0
            && risk.medium_threshold < risk.high_threshold
            && risk.high_threshold <= 1.0)
        {
            return Err(StrokeError::ConfigurationError(format!(
                "risk thresholds must satisfy 0 < medium < high <= 1 (medium={}, high={})",
                risk.medium_threshold, risk.high_threshold
            )));
        }
        if self.server.port == 0 {
            return Err(StrokeError::ConfigurationError("server.port must be non-zero".to_string()));
        }
        if !self.server.api_prefix.is_empty() && !self.server.api_prefix.starts_with('/') {
            return Err(StrokeError::ConfigurationError(
                "server.api_prefix must start with '/'".to_string(),
            ));
        }
        if self.pagination.default_per_page == 0 || self.pagination.max_per_page == 0 {
            return Err(StrokeError::ConfigurationError("pagination sizes must be non-zero".to_string()));
        }
        // A day is +/- 14h at most.
        if self.dashboard.utc_offset_minutes.abs() > 14 * 60 {
            return Err(StrokeError::ConfigurationError(format!(
                "dashboard.utc_offset_minutes out of range: {}",
                self.dashboard.utc_offset_minutes
            )));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(StrokeError::ConfigurationError("auth.token_ttl_hours must be positive".to_string()));
        }
        if self.auth.jwt_secret.is_empty() {
            return Err(StrokeError::ConfigurationError("auth.jwt_secret must not be empty".to_string()));
        }
        if self.environment == AppEnvironment::Production {
            if self.auth.jwt_secret == default_jwt_secret() {
                return Err(StrokeError::ConfigurationError(
                    "auth.jwt_secret is the built-in default; set SECRET_KEY or JWT_SECRET_KEY in production"
                        .to_string(),
                ));
            }
            if self.auth.default_admin_password == default_admin_password() {
                warn!("auth.default_admin_password is the built-in default; change it before exposing the service");
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::config::config_structs::{ScorerKind, StorageEngineType};

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "server:\n  port: 8080\nrisk:\n  high_threshold: 0.8\nmodel:\n  scorer: points\n";
        let config = AppConfig::from_yaml_str(yaml).unwrap().validate().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.risk.high_threshold, 0.8);
        assert_eq!(config.risk.medium_threshold, 0.4);
        assert_eq!(config.model.scorer, ScorerKind::Points);
        assert_eq!(config.storage.engine_type, StorageEngineType::Sled);
    }

    #[tokio::test]
    async fn shipped_config_file_loads() {
        let config = AppConfig::load(Some(Path::new("../config/stroke_risk.yaml")))
            .await
            .unwrap();
        assert_eq!(config.storage.engine_type, StorageEngineType::Sled);
        assert_eq!(config.model.scorer, ScorerKind::Model);
        assert_eq!(config.auth.roles_file, Some(PathBuf::from("./config/roles.yaml")));
        assert_eq!(config.pagination.max_per_page, 100);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml_str("  \n").unwrap(), AppConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("APP_ENV", "production"),
            ("SECRET_KEY", "from-secret-key"),
            ("JWT_SECRET_KEY", "from-jwt-key"),
            ("API_BASE_URL", "https://stroke.example.org"),
            ("STROKE_PORT", "9000"),
            ("STROKE_UTC_OFFSET_MINUTES", "-300"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_with(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.environment, AppEnvironment::Production);
        assert_eq!(config.auth.jwt_secret, "from-jwt-key");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.dashboard.utc_offset_minutes, -300);
        assert!(config.server.cors_origins.contains(&"https://stroke.example.org".to_string()));
    }

    #[test]
    fn production_rejects_default_jwt_secret() {
        let mut config = AppConfig::default();
        config.environment = AppEnvironment::Production;
        let result = config.clone().validate();
        assert!(matches!(result, Err(StrokeError::ConfigurationError(_))));

        config.auth.jwt_secret = "a-real-deployment-secret".to_string();
        assert!(config.validate().is_ok());

        // Development keeps working out of the box.
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_port_override_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env_with(|k| (k == "STROKE_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(StrokeError::ConfigurationError(_))));
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let mut config = AppConfig::default();
        config.risk.medium_threshold = 0.7;
        config.risk.high_threshold = 0.4;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.risk.medium_threshold = 0.0;
        assert!(config.validate().is_err());
    }
}
