//! Application Configuration Module
//!
//! Loads the relay's settings from environment variables (and a `.env` file,
//! when present) into one struct that is handed to every client at startup.

use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5001";
pub const DEFAULT_BLOB_CONTAINER: &str = "static-tmp";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub line_channel_access_token: SecretString,
    pub gemini_api_key: SecretString,
    pub gemini_model: String,
    pub azure_speech_key: SecretString,
    pub azure_region: String,
    pub azure_speech_voice: String,
    pub storage_connection_string: SecretString,
    pub blob_container: String,
    pub scratch_dir: Option<PathBuf>,
    pub session_idle_timeout: Duration,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `BIND_ADDRESS`: (Optional) Address the webhook server binds to. Defaults to "0.0.0.0:5001".
    /// *   `LINE_CHANNEL_ACCESS_TOKEN`: Bearer token for the LINE Messaging API.
    /// *   `GEMINI_API_KEY`: Your secret key for the Gemini API.
    /// *   `GEMINI_MODEL`: (Optional) Defaults to "gemini-1.5-flash".
    /// *   `AZURE_SPEECH_KEY` / `AZURE_REGION`: Azure Speech resource credentials.
    /// *   `AZURE_SPEECH_VOICE`: (Optional) Defaults to "zh-CN-XiaoxiaoNeural".
    /// *   `AZURE_STORAGE_CONNECTION_STRING`: Storage account connection string carrying an
    ///     `AccountKey` or a `SharedAccessSignature`.
    /// *   `BLOB_CONTAINER_NAME`: (Optional) Defaults to "static-tmp".
    /// *   `SCRATCH_DIR`: (Optional) Where temporary audio files go. Defaults to the OS temp dir.
    /// *   `SESSION_IDLE_SECS`: (Optional) Seconds before an idle sender's state is dropped. Defaults to a day.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
        };
        let optional = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let bind_address_str = optional("BIND_ADDRESS", DEFAULT_BIND_ADDRESS);
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = optional("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let session_idle_timeout = match lookup("SESSION_IDLE_SECS") {
            Some(secs) => secs.trim().parse::<u64>().map(Duration::from_secs).map_err(|e| {
                ConfigError::InvalidValue("SESSION_IDLE_SECS".to_string(), e.to_string())
            })?,
            None => relay_core::DEFAULT_SESSION_IDLE_TIMEOUT,
        };

        Ok(Self {
            bind_address,
            line_channel_access_token: SecretString::from(required("LINE_CHANNEL_ACCESS_TOKEN")?),
            gemini_api_key: SecretString::from(required("GEMINI_API_KEY")?),
            gemini_model: optional("GEMINI_MODEL", gemini_oracle::DEFAULT_MODEL),
            azure_speech_key: SecretString::from(required("AZURE_SPEECH_KEY")?),
            azure_region: required("AZURE_REGION")?,
            azure_speech_voice: optional("AZURE_SPEECH_VOICE", azure_speech::DEFAULT_VOICE),
            storage_connection_string: SecretString::from(required(
                "AZURE_STORAGE_CONNECTION_STRING",
            )?),
            blob_container: optional("BLOB_CONTAINER_NAME", DEFAULT_BLOB_CONTAINER),
            scratch_dir: lookup("SCRATCH_DIR").map(PathBuf::from),
            session_idle_timeout,
            log_level,
        })
    }
}
