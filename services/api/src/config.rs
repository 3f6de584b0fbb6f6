//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. The loaded `Config` is passed explicitly
//! into the shared state so tests can construct one with injected limits.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;
use tutor_core::quota::MAX_GUEST_MESSAGES;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub allowed_origin: String,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    /// Upper bound on a single model invocation so a slow external call
    /// cannot hold the request open indefinitely.
    pub model_timeout: Duration,
    /// Symmetric secret used to sign and verify bearer tokens.
    pub token_secret: String,
    pub max_guest_messages: u32,
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

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load API Keys and Secrets ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let token_secret = std::env::var("TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingVar("TOKEN_SECRET".to_string()))?;

        // --- Load Adapter-specific Settings ---
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let model_timeout_secs = match std::env::var("MODEL_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "MODEL_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a valid number of seconds", raw),
                )
            })?,
            Err(_) => 30,
        };

        let max_guest_messages = match std::env::var("MAX_GUEST_MESSAGES") {
            Ok(raw) => raw.parse::<u32>().map_err(|_| {
                ConfigError::InvalidValue(
                    "MAX_GUEST_MESSAGES".to_string(),
                    format!("'{}' is not a valid message count", raw),
                )
            })?,
            Err(_) => MAX_GUEST_MESSAGES,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            allowed_origin,
            openai_api_key,
            chat_model,
            model_timeout: Duration::from_secs(model_timeout_secs),
            token_secret,
            max_guest_messages,
        })
    }
}
