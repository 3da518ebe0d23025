//! Tracing setup for the binary. The filter defaults to this crate's own
//! events at the configured level; `RUST_LOG` overrides it wholesale.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, AppEnvironment};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log level '{value}' for the activities filter")]
    Filter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("failed to install the tracing subscriber: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Scope the default directive to this crate so chatty dependencies stay
/// quiet unless `RUST_LOG` asks for them.
fn crate_directive(level: &str) -> String {
    format!("activities_core={level}")
}

fn filter_for_level(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(crate_directive(level)).map_err(|source| TelemetryError::Filter {
        value: level.to_string(),
        source,
    })
}

/// Install the global subscriber: compact plain output in production,
/// pretty output everywhere else.
pub fn init(config: &AppConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_for_level(&config.telemetry.log_level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match config.environment {
        AppEnvironment::Production => builder.compact().with_ansi(false).try_init(),
        AppEnvironment::Development | AppEnvironment::Test => builder.pretty().try_init(),
    }
    .map_err(TelemetryError::Subscriber)
}
