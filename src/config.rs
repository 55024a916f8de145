use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const CONFIG_DIR: &str = "config";
const DEFAULT_PROFILE: &str = "development";
const DEFAULT_DATABASE_URL: &str = "sqlite://wishlists.db?mode=rwc";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// Pool sizing. SQLite URLs ignore the size and get one connection.
const POOL_MAX_CONNECTIONS: u32 = 16;
const POOL_MIN_CONNECTIONS: u32 = 2;
const POOL_CONNECT_TIMEOUT_SECS: u64 = 30;
const POOL_IDLE_TIMEOUT_SECS: u64 = 600;
const POOL_ACQUIRE_TIMEOUT_SECS: u64 = 8;

/// Settings for the catalog store and the CLI.
///
/// Read from `config/default.toml`, then `config/<profile>.toml`, then
/// `APP__*` variables (for example `APP__DATABASE_URL`). Unknown keys are
/// rejected.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// `sqlite://...` or `postgres://...`
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Profile name, taken from `RUN_ENV` / `APP_ENV` unless set explicitly
    #[validate(length(min = 1))]
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Emit log lines as JSON objects
    #[serde(default)]
    pub log_json: bool,

    /// Apply pending migrations before running a CLI command
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: POOL_MAX_CONNECTIONS,
            db_min_connections: POOL_MIN_CONNECTIONS,
            db_connect_timeout_secs: POOL_CONNECT_TIMEOUT_SECS,
            db_idle_timeout_secs: POOL_IDLE_TIMEOUT_SECS,
            db_acquire_timeout_secs: POOL_ACQUIRE_TIMEOUT_SECS,
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Field rules plus the cross-field pool check.
    pub fn validate_all(&self) -> Result<(), ValidationErrors> {
        self.validate()?;
        if self.db_min_connections > self.db_max_connections {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("pool_bounds");
            err.message = Some(
                format!(
                    "db_min_connections ({}) is larger than db_max_connections ({})",
                    self.db_min_connections, self.db_max_connections
                )
                .into(),
            );
            errors.add("db_min_connections", err);
            return Err(errors);
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("could not read configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    POOL_MAX_CONNECTIONS
}

fn default_db_min_connections() -> u32 {
    POOL_MIN_CONNECTIONS
}

fn default_db_connect_timeout_secs() -> u64 {
    POOL_CONNECT_TIMEOUT_SECS
}

fn default_db_idle_timeout_secs() -> u64 {
    POOL_IDLE_TIMEOUT_SECS
}

fn default_db_acquire_timeout_secs() -> u64 {
    POOL_ACQUIRE_TIMEOUT_SECS
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
        return Ok(());
    }
    let mut err = ValidationError::new("log_level");
    err.message = Some(format!("expected one of {}", LOG_LEVELS.join(", ")).into());
    Err(err)
}

/// Installs the global subscriber.
///
/// A non-empty `RUST_LOG` wins; otherwise the crate logs at `level` and
/// sea-orm at `warn`. Calling it twice keeps the first subscriber.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("wishlist_catalog={},sea_orm=warn", level));

    let filter = EnvFilter::new(directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads settings from `./config` and the environment.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads settings with `config_dir` as the directory of profile files.
///
/// Both files are optional. Later layers override earlier ones:
/// built-in defaults, `default.toml`, `<profile>.toml`, `APP__*` variables.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, AppConfigError> {
    let profile = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_PROFILE.to_string());
    info!(profile = %profile, dir = %config_dir.display(), "Loading configuration");

    let settings = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", profile.clone())?
        .add_source(File::from(config_dir.join("default")).required(false))
        .add_source(File::from(config_dir.join(&profile)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = settings.try_deserialize()?;
    app_config.validate_all().map_err(|e| {
        error!(error = %e, "Rejected configuration");
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn new_config_uses_pool_defaults() {
        let cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        assert_eq!(cfg.db_max_connections, 16);
        assert_eq!(cfg.db_min_connections, 2);
        assert_eq!(cfg.db_acquire_timeout_secs, 8);
        assert_eq!(cfg.log_level(), "info");
        assert!(cfg.validate_all().is_ok());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        cfg.log_level = "chatty".into();
        let errors = cfg.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("log_level"));
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        cfg.log_level = "WARN".into();
        assert!(cfg.validate_all().is_ok());
    }

    #[test]
    fn rejects_min_connections_above_max() {
        let mut cfg = AppConfig::new("sqlite::memory:".into(), "test".into());
        cfg.db_min_connections = 20;
        cfg.db_max_connections = 4;
        let errors = cfg.validate_all().unwrap_err();
        assert!(errors.field_errors().contains_key("db_min_connections"));
    }

    #[test]
    fn loads_default_file_from_config_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
            database_url = "postgres://localhost/wishlists"
            log_level = "debug"
            auto_migrate = true
            "#,
        )
        .unwrap();

        let cfg = load_config_from(dir.path()).unwrap();
        assert_eq!(cfg.database_url, "postgres://localhost/wishlists");
        assert_eq!(cfg.log_level(), "debug");
        assert!(cfg.auto_migrate);
        assert_eq!(cfg.db_max_connections, 16);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("default.toml"), "cache_ttl = 30\n").unwrap();

        assert!(matches!(
            load_config_from(dir.path()),
            Err(AppConfigError::Load(_))
        ));
    }
}
