//! Configuration management for Visitdesk server

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Smallest page size accepted for the export crawl
pub const MIN_EXPORT_PAGE_SIZE: u32 = 100;
/// Largest page size accepted for the export crawl
pub const MAX_EXPORT_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Remote record API the visit searches are issued against
#[derive(Debug, Deserialize, Clone)]
pub struct RecordApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// When set, logs are also written to daily rolling files in this directory
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    Redis,
    Memory,
}

impl PersistenceBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceBackend::Redis => "redis",
            PersistenceBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    pub backend: PersistenceBackend,
    pub key_prefix: String,
    /// Lifetime of an unconsumed navigation context
    pub navigation_ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Maximum settled pages kept per screen session
    pub max_entries: usize,
}

/// Lifetime of visit screens that are never explicitly unmounted
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Screens untouched for this long are persisted and dropped; 0 keeps them forever
    pub idle_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    pub page_size: u32,
    /// Upper bound on pages requested by a single crawl
    pub max_pages: u32,
    pub file_name: String,
}

impl ExportConfig {
    /// Page size used by the crawl, kept within the accepted range
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(MIN_EXPORT_PAGE_SIZE, MAX_EXPORT_PAGE_SIZE)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub record_api: RecordApiConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix VISITDESK_)
            .add_source(
                Environment::with_prefix("VISITDESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("record_api.base_url", env::var("RECORD_API_URL").ok())?
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            record_api: RecordApiConfig::default(),
            logging: LoggingConfig::default(),
            redis: RedisConfig::default(),
            persistence: PersistenceConfig::default(),
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for RecordApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: PersistenceBackend::Redis,
            key_prefix: "visitdesk".to_string(),
            navigation_ttl_seconds: 3600,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 64 }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: 1800,
            sweep_interval_seconds: 60,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            max_pages: 10_000,
            file_name: "visits.csv".to_string(),
        }
    }
}
