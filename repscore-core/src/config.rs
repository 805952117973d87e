use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Prefix for environment overrides, e.g. `REPSCORE_DATABASE__URL`.
pub const ENV_PREFIX: &str = "REPSCORE";

#[derive(Debug, Deserialize, Clone)]
pub struct RepscoreConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub socket_path: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default = "default_connect_retries")]
    pub connect_retries: usize,
}

fn default_connect_retries() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RefreshConfig {
    pub enabled: bool,
    pub interval_minutes: u64,
    /// Maximum number of legislators recomputed at once during a cycle.
    pub concurrency: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 60,
            concurrency: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SentimentConfig {
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_seconds: u64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            rate_limit_max_requests: 10,
            rate_limit_window_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    /// Shared secret for `POST /refresh`. When unset the endpoint rejects every call.
    pub cron_secret: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8787,
            cron_secret: None,
        }
    }
}

impl RepscoreConfig {
    /// Load from a TOML file, then apply `REPSCORE_*` environment overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        Self::build(
            Config::builder().add_source(File::with_name(path)),
            env_source(),
        )
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::build(
            Config::builder().add_source(File::from_str(raw, FileFormat::Toml)),
            env_source(),
        )
    }

    fn build(
        builder: ConfigBuilder<DefaultState>,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        builder.add_source(env).build()?.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
