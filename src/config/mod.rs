//! Layered service settings.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. `codebloom.toml` in the working directory, or an explicit file
//! 3. `CODEBLOOM_*` environment variables, `__` separating nested keys
//!    (`CODEBLOOM_SERVER__PORT=9000`)
//! 4. the bare `GROQ_API_KEY` and `PORT` variables

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::monitoring::{LogLevel, TelemetryConfig};

pub const ENV_PREFIX: &str = "CODEBLOOM";
pub const DEFAULT_CONFIG_FILE: &str = "codebloom.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    /// Chat is disabled without a key
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ChatSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Key with surrounding whitespace removed; blank counts as missing.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorSettings {
    /// `ndarray-lstm`, or `disabled`
    pub backend: String,
    pub sequence_length: usize,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            backend: crate::ml::NDARRAY_BACKEND.to_string(),
            sequence_length: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Install the tracing subscriber and emit request events
    pub enabled: bool,
    /// Keep user chat text out of request events
    pub anonymize_data: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            anonymize_data: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub log_level: String,
    pub server: ServerSettings,
    pub chat: ChatSettings,
    pub predictor: PredictorSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerSettings::default(),
            chat: ChatSettings::default(),
            predictor: PredictorSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl Settings {
    /// Load from every source, honouring the legacy `GROQ_API_KEY` and `PORT`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_overrides(
            path,
            ENV_PREFIX,
            std::env::var("GROQ_API_KEY").ok(),
            std::env::var("PORT").ok(),
        )
    }

    /// Defaults, file and prefixed environment, then `api_key` and `port`
    /// on top when given.
    pub fn load_with_overrides(
        path: Option<&Path>,
        prefix: &str,
        api_key: Option<String>,
        port: Option<String>,
    ) -> Result<Self> {
        let port = port
            .map(|p| p.trim().parse::<u16>().context("PORT must be a valid port number"))
            .transpose()?;

        let builder = Self::builder(path, prefix)?
            .set_override_option("chat.api_key", api_key)?
            .set_override_option("server.port", port.map(i64::from))?;

        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Defaults, file and prefixed environment only.
    pub fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self> {
        Self::builder(path, prefix)?
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    fn builder(path: Option<&Path>, prefix: &str) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let defaults = config::Config::try_from(&Settings::default())
            .context("Failed to serialize default configuration")?;

        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Ok(config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allowed_origins")
                    .try_parsing(true),
            ))
    }

    /// Telemetry settings combined with the top-level log level.
    pub fn telemetry_config(&self) -> Result<TelemetryConfig> {
        let log_level: LogLevel = self.log_level.parse()?;
        Ok(TelemetryConfig {
            enabled: self.telemetry.enabled,
            log_level,
            anonymize_data: self.telemetry.anonymize_data,
        })
    }

    pub fn chat_enabled(&self) -> bool {
        self.chat.api_key().is_some()
    }

    /// Effective settings as TOML with the API key masked.
    pub fn to_toml(&self) -> Result<String> {
        let mut redacted = self.clone();
        if redacted.chat.api_key.is_some() {
            redacted.chat.api_key = Some("********".to_string());
        }
        toml::to_string_pretty(&redacted).context("Failed to serialize configuration")
    }
}
