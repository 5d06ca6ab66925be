//! Configuration resolution for Sentinel.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/sentinel/settings.json)
//! 3. Project config (.sentinel/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const DEFAULT_SCAN_API_BASE_URL: &str = "https://sentinelai-backend.vercel.app/";
pub const DEFAULT_SCAN_API_KEY: &str = "sentinelai-secret-key";

/// Complete Sentinel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scan_api: ScanApiConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
    /// Origin used when building links sent to users.
    pub public_url: String,
    /// Per-user state unused for this long is dropped.
    pub context_idle_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_path: None,
            log_level: "info".to_string(),
            log_json: false,
            public_url: "http://localhost:8080".to_string(),
            context_idle_secs: 1800,
        }
    }
}

/// Remote scan service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanApiConfig {
    /// Base URL, joined with `scan/{kind}`. Keeps its trailing slash.
    pub base_url: String,
    pub api_key: String,
}

impl Default for ScanApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCAN_API_BASE_URL.to_string(),
            api_key: DEFAULT_SCAN_API_KEY.to_string(),
        }
    }
}

/// Payment gateway and pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Base URL, joined with `paystack/init` and `paystack/verify/{ref}`.
    pub base_url: String,
    /// Naira per US dollar.
    pub usd_to_ngn: f64,
    /// Price of a single token in a token pack, in US dollars.
    pub token_price_usd: f64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SCAN_API_BASE_URL.to_string(),
            usd_to_ngn: 1500.0,
            token_price_usd: 0.10,
        }
    }
}

/// Token accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// Tokens granted to a freshly created profile.
    pub signup_tokens: i64,
    /// Capacity of the in-memory recent-scans buffer.
    pub recent_capacity: usize,
    /// Row limit for history listings when none is given.
    pub history_limit: i64,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            signup_tokens: 2,
            recent_capacity: 10,
            history_limit: 50,
        }
    }
}

/// Identity tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub access_ttl_secs: i64,
    pub refresh_ttl_days: i64,
    pub reset_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_ttl_secs: 3600,
            refresh_ttl_days: 30,
            reset_ttl_secs: 3600,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    load_config_with(
        global_config_path().as_deref(),
        project_dir,
        |key| std::env::var(key).ok(),
    )
}

/// Same as [`load_config`] with an explicit global path and env lookup.
pub fn load_config_with(
    global_path: Option<&Path>,
    project_dir: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config = load_config_file(global_path)?;
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".sentinel").join("settings.json");
        if project_path.exists() {
            let content = read_config_file(&project_path)?;
            merge_json(&mut config, &content, &project_path)?;
        }
    }

    apply_env_overrides(&mut config, env);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sentinel").join("settings.json"))
}

/// Default database path for the server.
pub fn database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("sentinel").join("sentinel.db"))
}

fn read_config_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = read_config_file(path)?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Overlay a project file onto `base`. Only keys present in the file win,
/// so a project file naming one field keeps the rest of the global config.
fn merge_json(base: &mut Config, overlay: &str, path: &Path) -> Result<()> {
    let parse_err =
        |e: serde_json::Error| Error::Config(format!("Failed to parse config file {}: {}", path.display(), e));
    let overlay: serde_json::Value = serde_json::from_str(overlay).map_err(parse_err)?;
    let mut merged = serde_json::to_value(&*base)?;
    merge_values(&mut merged, overlay);
    *base = serde_json::from_value(merged).map_err(parse_err)?;
    Ok(())
}

fn merge_values(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge_values(base.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn apply_env_overrides(config: &mut Config, env: impl Fn(&str) -> Option<String>) {
    if let Some(val) = env("SENTINELAI_API_BASE_URL") {
        config.scan_api.base_url = val;
    }
    if let Some(val) = env("SENTINELAI_API_KEY") {
        config.scan_api.api_key = val;
    }
    if let Some(val) = env("SENTINEL_PAYMENTS_BASE_URL") {
        config.payments.base_url = val;
    }
    if let Some(val) = env("SENTINEL_PORT") {
        if let Ok(n) = val.parse() {
            config.server.port = n;
        }
    }
    if let Some(val) = env("SENTINEL_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Some(val) = env("SENTINEL_JWT_SECRET") {
        config.auth.jwt_secret = Some(val);
    }
}
