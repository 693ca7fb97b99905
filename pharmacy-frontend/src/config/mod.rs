use serde::Deserialize;
use std::path::PathBuf;

/// Directory of this crate inside the workspace, used to find `config/`.
const CRATE_DIR: &str = "pharmacy-frontend";

/// Every section has defaults, so the client runs without any config file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    /// Base URL of the REST API, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP transport.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    /// File holding the persisted session.
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: default_session_path(),
        }
    }
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".pharmacy").join("session.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// OTLP gRPC endpoint (e.g. http://tempo:4317); export is off when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            otlp_endpoint: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Load settings from `config/base.yaml` (optional) and `APP_*` environment
/// variables, e.g. `APP_API__BASE_URL=https://pharmacy.example.com/api`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    service_core::config::load(CRATE_DIR, "APP")
}
