//! Resolved runtime configuration.

pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_JELLYFIN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PREVIEW_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_JOB_BATCH_SIZE: usize = 10;
pub const DEFAULT_JOB_BATCH_DELAY_MS: u64 = 250;
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;
pub const DEFAULT_MAX_SCOPE_ITEMS: usize = 10_000;
pub const DEFAULT_SCAN_BATCH_SIZE: usize = 50;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// `None` disables external writes
    pub jellyfin: Option<JellyfinConfig>,
    pub operations: OperationsConfig,
    pub scan: ScanConfig,
    pub providers: ProvidersConfig,
    pub cors: CorsConfig,
    pub metadata: ConfigMetadata,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            jellyfin: None,
            operations: OperationsConfig::default(),
            scan: ScanConfig::default(),
            providers: ProvidersConfig::default(),
            cors: CorsConfig::default(),
            metadata: ConfigMetadata::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// In-memory stores are used when unset
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct JellyfinConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl JellyfinConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for JellyfinConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JellyfinConfig")
            .field("url", &self.url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationsConfig {
    pub preview_ttl_secs: u64,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub max_concurrent_jobs: usize,
    pub max_scope_items: usize,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self {
            preview_ttl_secs: DEFAULT_PREVIEW_TTL_SECS,
            batch_size: DEFAULT_JOB_BATCH_SIZE,
            batch_delay_ms: DEFAULT_JOB_BATCH_DELAY_MS,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            max_scope_items: DEFAULT_MAX_SCOPE_ITEMS,
        }
    }
}

impl OperationsConfig {
    pub fn preview_ttl(&self) -> Duration {
        Duration::from_secs(self.preview_ttl_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub batch_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidersConfig {
    pub tvmaze_enabled: bool,
    pub timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            tvmaze_enabled: true,
            timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsConfig {
    /// Empty allows any origin
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.is_empty()
            || self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

/// Where the resolved values came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
