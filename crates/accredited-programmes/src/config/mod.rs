use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DEFAULT_CASE_LIST_PAGE_SIZE: usize = 15;
const DEFAULT_SESSION_IDLE_MINUTES: u64 = 120;

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
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub session: SessionConfig,
    pub features: FeatureFlags,
    pub case_list: CaseListConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cookie_name =
            env::var("ACP_SESSION_COOKIE").unwrap_or_else(|_| "acp.session".to_string());
        if cookie_name.trim().is_empty() || cookie_name.contains([';', '=', ' ']) {
            return Err(ConfigError::InvalidCookieName(cookie_name));
        }

        let idle_minutes = match env::var("ACP_SESSION_IDLE_MINUTES") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => return Err(ConfigError::InvalidSessionIdle(raw)),
            },
            Err(_) => DEFAULT_SESSION_IDLE_MINUTES,
        };

        let page_size = match env::var("ACP_CASE_LIST_PAGE_SIZE") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => return Err(ConfigError::InvalidPageSize(raw)),
            },
            Err(_) => DEFAULT_CASE_LIST_PAGE_SIZE,
        };

        let features = FeatureFlags {
            transfer: flag("ACP_FEATURE_TRANSFER", true)?,
            find: flag("ACP_FEATURE_FIND", true)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            session: SessionConfig {
                cookie_name,
                secure: environment == AppEnvironment::Production,
                idle_timeout: Duration::from_secs(idle_minutes * 60),
            },
            features,
            case_list: CaseListConfig { page_size },
        })
    }
}

fn flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Cookie settings for the per-browser session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub secure: bool,
    /// Sessions untouched for longer than this are dropped from the store.
    pub idle_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "acp.session".to_string(),
            secure: false,
            idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_MINUTES * 60),
        }
    }
}

/// Journeys that can be switched off; disabled routes answer 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub transfer: bool,
    pub find: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            transfer: true,
            find: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CaseListConfig {
    pub page_size: usize,
}

impl Default for CaseListConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_CASE_LIST_PAGE_SIZE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCookieName(String),
    InvalidPageSize(String),
    InvalidSessionIdle(String),
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCookieName(value) => {
                write!(f, "ACP_SESSION_COOKIE '{value}' is not a valid cookie name")
            }
            ConfigError::InvalidPageSize(value) => {
                write!(
                    f,
                    "ACP_CASE_LIST_PAGE_SIZE must be a positive integer, found '{value}'"
                )
            }
            ConfigError::InvalidSessionIdle(value) => {
                write!(
                    f,
                    "ACP_SESSION_IDLE_MINUTES must be a positive integer, found '{value}'"
                )
            }
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false, found '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
