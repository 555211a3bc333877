use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub provider: ProviderConfig,
    pub scoring: ScoringSettings,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            provider: ProviderConfig::load()?,
            scoring: ScoringSettings::load()?,
        })
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

/// Connection settings for the completion endpoint used to score opportunities.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub analysis_deadline_secs: u64,
}

impl ProviderConfig {
    fn load() -> Result<Self, ConfigError> {
        let base_url = env::var("PROVIDER_BASE_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string());
        let api_key = env::var("PROVIDER_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let model = env::var("PROVIDER_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());
        let timeout_secs = parse_env_u64("PROVIDER_TIMEOUT_SECS", 30)?;
        let max_retries = parse_env_u64("PROVIDER_MAX_RETRIES", 2)? as u32;
        let analysis_deadline_secs = parse_env_u64("ANALYSIS_DEADLINE_SECS", 60)?;

        Ok(Self {
            base_url,
            api_key,
            model,
            timeout_secs,
            max_retries,
            analysis_deadline_secs,
        })
    }
}

/// Scoring knobs resolved from the environment. Weights stay with the criteria
/// registry; these settings cover thresholds and the score scale.
#[derive(Debug, Clone)]
pub struct ScoringSettings {
    pub go_threshold: f64,
    pub review_threshold: Option<f64>,
    pub scale_min: u8,
    pub scale_max: u8,
    pub uniform_weights: bool,
}

impl ScoringSettings {
    fn load() -> Result<Self, ConfigError> {
        let go_threshold = parse_env_f64("SCORING_GO_THRESHOLD", 3.0)?;
        let review_threshold = match env::var("SCORING_REVIEW_THRESHOLD") {
            Ok(raw) if raw.trim().eq_ignore_ascii_case("off") => None,
            Ok(raw) => Some(raw.trim().parse::<f64>().map_err(|_| {
                ConfigError::InvalidNumber {
                    key: "SCORING_REVIEW_THRESHOLD",
                }
            })?),
            Err(_) => Some(2.5),
        };
        let scale_min = parse_env_u64("SCORING_SCALE_MIN", 1)? as u8;
        let scale_max = parse_env_u64("SCORING_SCALE_MAX", 5)? as u8;
        if scale_min >= scale_max {
            return Err(ConfigError::InvalidScale {
                min: scale_min,
                max: scale_max,
            });
        }
        let uniform_weights = env::var("SCORING_UNIFORM_WEIGHTS")
            .map(|raw| matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            go_threshold,
            review_threshold,
            scale_min,
            scale_max,
            uniform_weights,
        })
    }
}

fn parse_env_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn parse_env_f64(key: &'static str, default: f64) -> Result<f64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidScale { min: u8, max: u8 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{} must be a valid number", key)
            }
            ConfigError::InvalidScale { min, max } => {
                write!(f, "score scale [{min}, {max}] must satisfy min < max")
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PROVIDER_BASE_URL",
            "PROVIDER_API_KEY",
            "PROVIDER_MODEL",
            "PROVIDER_TIMEOUT_SECS",
            "PROVIDER_MAX_RETRIES",
            "ANALYSIS_DEADLINE_SECS",
            "SCORING_GO_THRESHOLD",
            "SCORING_REVIEW_THRESHOLD",
            "SCORING_SCALE_MIN",
            "SCORING_SCALE_MAX",
            "SCORING_UNIFORM_WEIGHTS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.provider.model, "deepseek-chat");
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.scoring.go_threshold, 3.0);
        assert_eq!(config.scoring.review_threshold, Some(2.5));
        assert_eq!(config.scoring.scale_max, 5);
    }

    #[test]
    fn review_threshold_can_be_disabled() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORING_REVIEW_THRESHOLD", "off");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.scoring.review_threshold, None);
        reset_env();
    }

    #[test]
    fn rejects_inverted_scale() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCORING_SCALE_MIN", "5");
        env::set_var("SCORING_SCALE_MAX", "4");
        match AppConfig::load() {
            Err(ConfigError::InvalidScale { min: 5, max: 4 }) => {}
            other => panic!("expected scale error, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }
}
