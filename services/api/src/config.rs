//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use chrono::NaiveTime;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use subtrack_core::reminders;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub log_level: Level,
    pub ai_api_base: String,
    pub ai_model: String,
    pub rates_api_url: String,
    pub rates_refresh_interval: Duration,
    pub reminder_time: NaiveTime,
    pub reminder_window_days: i64,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 5000)),
            data_dir: PathBuf::from("./data"),
            static_dir: PathBuf::from("./public"),
            log_level: Level::INFO,
            ai_api_base: "https://api.groq.com/openai/v1".to_string(),
            ai_model: "llama-3.3-70b-versatile".to_string(),
            rates_api_url: "https://open.er-api.com/v6/latest/USD".to_string(),
            rates_refresh_interval: Duration::from_secs(24 * 60 * 60),
            reminder_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            reminder_window_days: reminders::DEFAULT_WINDOW_DAYS,
            http_timeout: Duration::from_secs(30),
        }
    }
}

/// Reads `name` and parses it, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        let defaults = Config::default();

        // --- Server and storage ---
        let bind_address = parse_var("BIND_ADDRESS", defaults.bind_address)?;
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- External services ---
        let ai_api_base = std::env::var("AI_API_BASE").unwrap_or(defaults.ai_api_base);
        let ai_model = std::env::var("AI_MODEL").unwrap_or(defaults.ai_model);
        let rates_api_url = std::env::var("RATES_API_URL").unwrap_or(defaults.rates_api_url);

        let refresh_hours: u64 = parse_var("RATES_REFRESH_HOURS", 24)?;
        if refresh_hours == 0 {
            return Err(ConfigError::InvalidValue(
                "RATES_REFRESH_HOURS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let http_timeout_secs: u64 = parse_var("HTTP_TIMEOUT_SECS", 30)?;

        // --- Reminders ---
        let reminder_time = match std::env::var("REMINDER_TIME") {
            Ok(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                ConfigError::InvalidValue("REMINDER_TIME".to_string(), e.to_string())
            })?,
            Err(_) => defaults.reminder_time,
        };
        let reminder_window_days: i64 =
            parse_var("REMINDER_WINDOW_DAYS", defaults.reminder_window_days)?;
        if reminder_window_days < 0 {
            return Err(ConfigError::InvalidValue(
                "REMINDER_WINDOW_DAYS".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            data_dir,
            static_dir,
            log_level,
            ai_api_base,
            ai_model,
            rates_api_url,
            rates_refresh_interval: Duration::from_secs(refresh_hours * 60 * 60),
            reminder_time,
            reminder_window_days,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}
