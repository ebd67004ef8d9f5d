use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::utils::truncate_for_log;

/// Characters of user text kept in log lines.
const LOGGED_MESSAGE_CHARS: usize = 50;

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub log_level: LogLevel,
    /// Strip user text from chat events
    pub anonymize_data: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: LogLevel::Info,
            anonymize_data: false,
        }
    }
}

/// Log levels matching tracing's levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(anyhow!("Unknown log level: {}", other)),
        }
    }
}

/// Performance tracking for operations
pub struct PerformanceTracker {
    start_time: Instant,
    operation_name: String,
}

impl PerformanceTracker {
    pub fn new(operation_name: &str) -> Self {
        Self {
            start_time: Instant::now(),
            operation_name: operation_name.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for PerformanceTracker {
    fn drop(&mut self) {
        debug!(
            operation = %self.operation_name,
            duration_ms = %format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Centralized telemetry manager
#[derive(Debug, Clone)]
pub struct TelemetryManager {
    config: TelemetryConfig,
}

impl TelemetryManager {
    /// Install the global tracing subscriber. `RUST_LOG` wins over the
    /// configured level when set.
    pub fn init(config: Option<TelemetryConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();

        if config.enabled {
            let env_filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer::layer().with_target(false))
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize tracing: {}", e))?;
        }

        Ok(Self { config })
    }

    /// Manager that logs through whatever subscriber is already installed.
    pub fn detached(config: TelemetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Log an incoming request, with a shortened copy of any user text.
    pub fn log_request(&self, endpoint: &str, method: &str, user_message: Option<&str>) {
        if !self.config.enabled {
            return;
        }

        match user_message {
            Some(_) if self.config.anonymize_data => {
                info!(%method, %endpoint, message = "anonymized", "Request received");
            }
            Some(message) => {
                let preview = truncate_for_log(message, LOGGED_MESSAGE_CHARS);
                info!(%method, %endpoint, message = %preview, "Request received");
            }
            None => info!(%method, %endpoint, "Request received"),
        }
    }

    pub fn log_response(&self, endpoint: &str, status: &str, duration_ms: f64) {
        if !self.config.enabled {
            return;
        }
        info!(%endpoint, %status, duration_ms = %format!("{:.2}", duration_ms), "Request completed");
    }
}

impl Default for TelemetryManager {
    fn default() -> Self {
        Self::detached(TelemetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("info" => LogLevel::Info)]
    #[test_case("WARNING" => LogLevel::Warn)]
    #[test_case(" debug " => LogLevel::Debug)]
    fn test_log_level_parse(value: &str) -> LogLevel {
        value.parse().unwrap()
    }

    #[test]
    fn test_unknown_log_level() {
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_telemetry_initialization() {
        let config = TelemetryConfig {
            enabled: true,
            log_level: LogLevel::Debug,
            anonymize_data: true,
        };

        // a second global subscriber is refused, which must not panic
        let _ = TelemetryManager::init(Some(config.clone()));
        assert!(TelemetryManager::init(Some(config)).is_err());

        let telemetry = TelemetryManager::default();
        telemetry.log_request("/chat", "POST", Some("How long is a normal cycle?"));
        telemetry.log_response("/chat", "success", 12.5);
    }

    #[test]
    fn test_performance_tracker() {
        let tracker = PerformanceTracker::new("test_operation");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(tracker.elapsed_ms() >= 10.0);
    }
}
