use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::provider::MidtransConfig;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_DATABASE_URL: &str = "sqlite://mochi_orders.db?mode=rwc";
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment (`development`, `production`, ...)
    #[validate(length(min = 1))]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Run migrations on startup
    #[serde(default = "default_true_bool")]
    pub auto_migrate: bool,

    /// Storefront origin; also the base of payment redirect URLs
    #[serde(default = "default_frontend_url")]
    #[validate(custom = "validate_frontend_url")]
    pub frontend_url: String,

    #[serde(default = "default_true_bool")]
    pub cors_allow_credentials: bool,

    /// Midtrans server key (never logged)
    #[validate(custom = "validate_server_key")]
    pub midtrans_server_key: String,

    /// Midtrans client key, handed to the storefront for Snap.js
    #[serde(default)]
    pub midtrans_client_key: Option<String>,

    /// Overrides the mode derived from `environment`
    #[serde(default)]
    pub midtrans_is_production: Option<bool>,

    #[serde(default)]
    pub midtrans_snap_base_url: Option<String>,

    #[serde(default)]
    pub midtrans_api_base_url: Option<String>,

    /// Upper bound on every provider call
    #[serde(default = "default_provider_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub provider_timeout_secs: u64,

    /// Payment window handed to Midtrans
    #[serde(default = "default_transaction_expiry_minutes")]
    #[validate(range(min = 1, max = 10080))]
    pub transaction_expiry_minutes: u32,

    #[serde(default = "default_order_id_prefix")]
    #[validate(custom = "validate_order_id_prefix")]
    pub order_id_prefix: String,

    /// Interval of the stale-order reconciler; 0 disables it
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1, message = "event_channel_capacity must be greater than 0"))]
    pub event_channel_capacity: usize,
}

impl AppConfig {
    pub fn new(midtrans_server_key: String, environment: String) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: default_port(),
            environment,
            log_level: default_log_level(),
            log_json: false,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            auto_migrate: true,
            frontend_url: default_frontend_url(),
            cors_allow_credentials: true,
            midtrans_server_key,
            midtrans_client_key: None,
            midtrans_is_production: None,
            midtrans_snap_base_url: None,
            midtrans_api_base_url: None,
            provider_timeout_secs: default_provider_timeout_secs(),
            transaction_expiry_minutes: default_transaction_expiry_minutes(),
            order_id_prefix: default_order_id_prefix(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Whether Midtrans calls go to production rather than sandbox
    pub fn midtrans_production(&self) -> bool {
        self.midtrans_is_production
            .unwrap_or_else(|| self.is_production())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_secs > 0).then(|| Duration::from_secs(self.reconcile_interval_secs))
    }

    pub fn midtrans_config(&self) -> MidtransConfig {
        let mut cfg = MidtransConfig::new(self.midtrans_server_key.clone(), self.midtrans_production());
        if let Some(url) = &self.midtrans_snap_base_url {
            cfg.snap_base_url = url.clone();
        }
        if let Some(url) = &self.midtrans_api_base_url {
            cfg.api_base_url = url.clone();
        }
        cfg.request_timeout = self.provider_timeout();
        cfg
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let key = self.midtrans_server_key.trim();
        if self.midtrans_production() && key.starts_with("SB-") {
            let mut err = ValidationError::new("midtrans_server_key_sandbox");
            err.message = Some(
                "A sandbox server key (SB-...) cannot be used in Midtrans production mode. Set APP__MIDTRANS_SERVER_KEY."
                    .into(),
            );
            errors.add("midtrans_server_key", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_true_bool() -> bool {
    true
}
fn default_frontend_url() -> String {
    DEFAULT_FRONTEND_URL.to_string()
}
fn default_provider_timeout_secs() -> u64 {
    15
}
fn default_transaction_expiry_minutes() -> u32 {
    60
}
fn default_order_id_prefix() -> String {
    crate::order_id::DEFAULT_PREFIX.to_string()
}
fn default_reconcile_interval_secs() -> u64 {
    300
}
fn default_event_channel_capacity() -> usize {
    256
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_frontend_url(value: &str) -> Result<(), ValidationError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => {
            let mut err = ValidationError::new("frontend_url");
            err.message = Some("Must be an absolute http(s) URL".into());
            Err(err)
        }
    }
}

fn validate_server_key(key: &str) -> Result<(), ValidationError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("midtrans_server_key");
        err.message = Some("Midtrans server key is required".into());
        return Err(err);
    }
    if trimmed.eq_ignore_ascii_case("your-server-key") || trimmed.eq_ignore_ascii_case("changeme")
    {
        let mut err = ValidationError::new("midtrans_server_key");
        err.message = Some("Midtrans server key is still a placeholder".into());
        return Err(err);
    }
    Ok(())
}

fn validate_order_id_prefix(prefix: &str) -> Result<(), ValidationError> {
    let ok = (1..=10).contains(&prefix.len())
        && prefix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        let mut err = ValidationError::new("order_id_prefix");
        err.message = Some("Must be 1-10 uppercase letters or digits".into());
        Err(err)
    }
}


/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("dasai_mochi_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);
    let filter = EnvFilter::new(filter_directive);

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

pub fn load_config_from(dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    // midtrans_server_key has no default; it must come from a file or APP__MIDTRANS_SERVER_KEY
    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("midtrans_server_key").is_err() {
        error!("Midtrans server key is not configured. Set APP__MIDTRANS_SERVER_KEY.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "midtrans_server_key is required but not configured. Set APP__MIDTRANS_SERVER_KEY."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
