// lib/src/config/config_defaults.rs
// Default values referenced from `#[serde(default = "...")]` attributes.

use std::path::PathBuf;

use crate::config::config_structs::{AppEnvironment, ScorerKind, StorageEngineType};

pub const DEFAULT_CONFIG_FILE_ENV: &str = "STROKE_CONFIG";
pub const DEFAULT_DATA_DIRECTORY: &str = "./data/stroke_risk";
pub const DEFAULT_MODEL_ARTIFACT: &str = "./assets/stroke_risk_model.json";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@hospital.com";

pub fn default_environment() -> AppEnvironment { AppEnvironment::Development }

pub fn default_host() -> String { "127.0.0.1".to_string() }
pub fn default_port() -> u16 { 3000 }
pub fn default_api_prefix() -> String { "/api".to_string() }
pub fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5000".to_string(), "http://127.0.0.1:5000".to_string()]
}

pub fn default_storage_engine_type() -> StorageEngineType { StorageEngineType::Sled }
pub fn default_data_directory() -> PathBuf { PathBuf::from(DEFAULT_DATA_DIRECTORY) }
pub fn default_cache_capacity() -> u64 { 64 * 1024 * 1024 }

pub fn default_scorer() -> ScorerKind { ScorerKind::Model }
pub fn default_artifact_path() -> PathBuf { PathBuf::from(DEFAULT_MODEL_ARTIFACT) }

pub fn default_high_threshold() -> f64 { 0.7 }
pub fn default_medium_threshold() -> f64 { 0.4 }
pub fn default_score_on_create() -> bool { true }

pub fn default_jwt_secret() -> String { "jwt-secret-key".to_string() }
pub fn default_token_ttl_hours() -> i64 { 24 }
pub fn default_seed_admin() -> bool { true }
pub fn default_admin_email() -> String { DEFAULT_ADMIN_EMAIL.to_string() }
pub fn default_admin_password() -> String { "admin123".to_string() }
pub fn default_admin_name() -> String { "System Administrator".to_string() }

pub fn default_utc_offset_minutes() -> i32 { 0 }
pub fn default_recent_limit() -> usize { 5 }
pub fn default_trend_months() -> u32 { 6 }

pub fn default_per_page() -> usize { 25 }
pub fn default_max_per_page() -> usize { 100 }
