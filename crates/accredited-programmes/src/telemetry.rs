//! Log output for the referral service.
//!
//! `APP_LOG_LEVEL` sets the level for this service's own crates while dependencies stay at
//! `warn`, so a `debug` run shows referral decisions without hyper's connection chatter.
//! `RUST_LOG` replaces the whole filter when set.

use std::fmt;

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;

/// Targets that follow the configured level.
const SERVICE_TARGETS: [&str; 2] = ["accredited_programmes", "accredited_programmes_web"];
const DEPENDENCY_LEVEL: &str = "warn";

#[derive(Debug)]
pub enum TelemetryError {
    InvalidDirectives { directives: String, source: ParseError },
    AlreadyInstalled(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidDirectives { directives, .. } => {
                write!(f, "APP_LOG_LEVEL produced unusable log directives '{directives}'")
            }
            TelemetryError::AlreadyInstalled(err) => {
                write!(f, "a log subscriber is already installed: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidDirectives { source, .. } => Some(source),
            TelemetryError::AlreadyInstalled(err) => Some(&**err),
        }
    }
}

/// Expands a bare level into per-target directives. Anything already written as
/// directives (`target=level` or a comma list) is used as given.
pub fn directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.contains(['=', ',']) {
        return level.to_string();
    }

    let mut directives = DEPENDENCY_LEVEL.to_string();
    for target in SERVICE_TARGETS {
        directives.push_str(&format!(",{target}={level}"));
    }
    directives
}

pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directives = directives(&config.log_level);
    EnvFilter::try_new(&directives)
        .map_err(|source| TelemetryError::InvalidDirectives { directives, source })
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::AlreadyInstalled)?;

    tracing::debug!(
        log_level = %config.log_level,
        directives = %directives(&config.log_level),
        "logging initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_level_applies_to_service_crates_only() {
        assert_eq!(
            directives("debug"),
            "warn,accredited_programmes=debug,accredited_programmes_web=debug"
        );
        assert_eq!(directives("hyper=info,acp=trace"), "hyper=info,acp=trace");
    }

    #[test]
    fn rejects_unparseable_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = TelemetryConfig {
            log_level: "acp=loud".to_string(),
        };
        assert!(matches!(
            env_filter(&config),
            Err(TelemetryError::InvalidDirectives { .. })
        ));
    }
}
