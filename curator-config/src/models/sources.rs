use std::collections::HashMap;

use serde::Deserialize;

use crate::util::{non_blank, parse_bool, parse_csv};

/// Raw TOML file contents. Every value is optional so that partial files
/// layer cleanly over the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: FileServerConfig,
    pub database: FileDatabaseConfig,
    pub jellyfin: FileJellyfinConfig,
    pub operations: FileOperationsConfig,
    pub scan: FileScanConfig,
    pub providers: FileProvidersConfig,
    pub cors: FileCorsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileDatabaseConfig {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileJellyfinConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileOperationsConfig {
    pub preview_ttl_secs: Option<u64>,
    pub batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
    pub max_concurrent_jobs: Option<usize>,
    pub max_scope_items: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileScanConfig {
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileProvidersConfig {
    pub tvmaze_enabled: Option<bool>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileCorsConfig {
    pub allowed_origins: Option<Vec<String>>,
}

/// Environment overrides. Unparseable values are ignored and the lower
/// layer wins.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub config_path: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub db_max_connections: Option<u32>,
    pub jellyfin_url: Option<String>,
    pub jellyfin_api_key: Option<String>,
    pub jellyfin_timeout_secs: Option<u64>,
    pub preview_ttl_secs: Option<u64>,
    pub job_batch_size: Option<usize>,
    pub job_batch_delay_ms: Option<u64>,
    pub max_concurrent_jobs: Option<usize>,
    pub max_scope_items: Option<usize>,
    pub scan_batch_size: Option<usize>,
    pub cors_origins: Option<Vec<String>>,
    pub tvmaze_enabled: Option<bool>,
    pub provider_timeout_secs: Option<u64>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_map(values: &HashMap<String, String>) -> Self {
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |name: &str| non_blank(lookup(name));
        let number = |name: &str| string(name).and_then(|raw| raw.trim().parse::<u64>().ok());

        Self {
            config_path: string("CURATOR_CONFIG_PATH"),
            host: string("CURATOR_HOST"),
            port: string("CURATOR_PORT").and_then(|raw| raw.trim().parse().ok()),
            database_url: string("DATABASE_URL"),
            db_max_connections: string("CURATOR_DB_MAX_CONNECTIONS")
                .and_then(|raw| raw.trim().parse().ok()),
            jellyfin_url: string("JELLYFIN_URL"),
            jellyfin_api_key: string("JELLYFIN_API_KEY"),
            jellyfin_timeout_secs: number("JELLYFIN_TIMEOUT_SECS"),
            preview_ttl_secs: number("CURATOR_PREVIEW_TTL_SECS"),
            job_batch_size: string("CURATOR_JOB_BATCH_SIZE")
                .and_then(|raw| raw.trim().parse().ok()),
            job_batch_delay_ms: number("CURATOR_JOB_BATCH_DELAY_MS"),
            max_concurrent_jobs: string("CURATOR_MAX_CONCURRENT_JOBS")
                .and_then(|raw| raw.trim().parse().ok()),
            max_scope_items: string("CURATOR_MAX_SCOPE_ITEMS")
                .and_then(|raw| raw.trim().parse().ok()),
            scan_batch_size: string("CURATOR_SCAN_BATCH_SIZE")
                .and_then(|raw| raw.trim().parse().ok()),
            cors_origins: string("CURATOR_CORS_ORIGINS").map(|raw| parse_csv(&raw)),
            tvmaze_enabled: string("TVMAZE_ENABLED").and_then(|raw| parse_bool(&raw)),
            provider_timeout_secs: number("PROVIDER_TIMEOUT_SECS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_values_fall_through() {
        let env = EnvConfig::from_map(&HashMap::from([
            ("CURATOR_PORT".to_string(), "not-a-port".to_string()),
            ("CURATOR_JOB_BATCH_SIZE".to_string(), " 25 ".to_string()),
            ("TVMAZE_ENABLED".to_string(), "off".to_string()),
            ("JELLYFIN_URL".to_string(), "   ".to_string()),
        ]));
        assert_eq!(env.port, None);
        assert_eq!(env.job_batch_size, Some(25));
        assert_eq!(env.tvmaze_enabled, Some(false));
        assert_eq!(env.jellyfin_url, None);
    }

    #[test]
    fn partial_file_parses() {
        let file: FileConfig = toml::from_str(
            r#"
            [operations]
            batch_size = 5

            [cors]
            allowed_origins = ["http://localhost:5173"]
            "#,
        )
        .unwrap();
        assert_eq!(file.operations.batch_size, Some(5));
        assert!(file.server.port.is_none());
        assert_eq!(file.cors.allowed_origins.unwrap().len(), 1);
    }
}
