use std::env;
use std::fmt;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub scheduling: SchedulingConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let horizon_days = env::var("APP_SCHEDULE_HORIZON_DAYS")
            .unwrap_or_else(|_| "14".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidHorizon)?;
        if horizon_days == 0 {
            return Err(ConfigError::InvalidHorizon);
        }

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            scheduling: SchedulingConfig { horizon_days },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Settings controlling instance materialization.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Number of days ahead of today to keep session instances materialized.
    pub horizon_days: u16,
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidHorizon,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidHorizon => {
                write!(f, "APP_SCHEDULE_HORIZON_DAYS must be a positive u16")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
