use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::models::sources::{EnvConfig, FileConfig, FileJellyfinConfig};
use crate::models::{
    Config, ConfigMetadata, CorsConfig, DEFAULT_DB_MAX_CONNECTIONS, DEFAULT_HOST,
    DEFAULT_JELLYFIN_TIMEOUT_SECS, DEFAULT_JOB_BATCH_DELAY_MS, DEFAULT_JOB_BATCH_SIZE,
    DEFAULT_MAX_CONCURRENT_JOBS, DEFAULT_MAX_SCOPE_ITEMS, DEFAULT_PORT,
    DEFAULT_PREVIEW_TTL_SECS, DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_SCAN_BATCH_SIZE,
    DatabaseConfig, JellyfinConfig, OperationsConfig, ProvidersConfig, ScanConfig,
    ServerConfig,
};
use crate::util::non_blank;
use crate::validation::{self, ConfigGuardRailError, ConfigWarnings};

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("curator.toml"),
        PathBuf::from("config/curator.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file {path} does not exist")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("JELLYFIN_URL is set but JELLYFIN_API_KEY is missing")]
    MissingJellyfinApiKey,
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathProvenance {
    Explicit,
    Env,
    Default,
}

impl PathProvenance {
    fn is_explicit(self) -> bool {
        matches!(self, PathProvenance::Explicit | PathProvenance::Env)
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, then the TOML file, then the process environment.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolve against an explicit set of environment values without touching
    /// the process environment.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn resolve_path(&self, env: &EnvConfig) -> Option<(PathBuf, PathProvenance)> {
        if let Some(explicit) = &self.options.config_path {
            return Some((explicit.clone(), PathProvenance::Explicit));
        }
        if let Some(from_env) = &env.config_path {
            return Some((PathBuf::from(from_env), PathProvenance::Env));
        }
        DEFAULT_CONFIG_LOCATIONS
            .iter()
            .find(|candidate| candidate.exists())
            .map(|path| (path.clone(), PathProvenance::Default))
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let Some((path, provenance)) = self.resolve_path(env) else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|err| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source: err,
    })
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if file_config.is_none() {
        warnings.push_with_hint(
            "No curator.toml detected; using defaults and environment variables",
            "Create curator.toml or set CURATOR_CONFIG_PATH",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        jellyfin: file_jellyfin,
        operations: file_operations,
        scan: file_scan,
        providers: file_providers,
        cors: file_cors,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .host
            .clone()
            .or(non_blank(file_server.host))
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let database = DatabaseConfig {
        url: env.database_url.clone().or(non_blank(file_database.url)),
        max_connections: env
            .db_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
    };

    let jellyfin = resolve_jellyfin(&env, file_jellyfin)?;

    let operations = OperationsConfig {
        preview_ttl_secs: env
            .preview_ttl_secs
            .or(file_operations.preview_ttl_secs)
            .unwrap_or(DEFAULT_PREVIEW_TTL_SECS),
        batch_size: env
            .job_batch_size
            .or(file_operations.batch_size)
            .unwrap_or(DEFAULT_JOB_BATCH_SIZE),
        batch_delay_ms: env
            .job_batch_delay_ms
            .or(file_operations.batch_delay_ms)
            .unwrap_or(DEFAULT_JOB_BATCH_DELAY_MS),
        max_concurrent_jobs: env
            .max_concurrent_jobs
            .or(file_operations.max_concurrent_jobs)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS),
        max_scope_items: env
            .max_scope_items
            .or(file_operations.max_scope_items)
            .unwrap_or(DEFAULT_MAX_SCOPE_ITEMS),
    };

    let scan = ScanConfig {
        batch_size: env
            .scan_batch_size
            .or(file_scan.batch_size)
            .unwrap_or(DEFAULT_SCAN_BATCH_SIZE),
    };

    let providers = ProvidersConfig {
        tvmaze_enabled: env
            .tvmaze_enabled
            .or(file_providers.tvmaze_enabled)
            .unwrap_or(true),
        timeout_secs: env
            .provider_timeout_secs
            .or(file_providers.timeout_secs)
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
    };

    let cors = CorsConfig {
        allowed_origins: env
            .cors_origins
            .clone()
            .or(file_cors.allowed_origins)
            .unwrap_or_default(),
    };

    let config = Config {
        server,
        database,
        jellyfin,
        operations,
        scan,
        providers,
        cors,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    };

    let guard_warnings = validation::apply_guard_rails(&config)?;
    warnings.extend(guard_warnings);

    Ok((config, warnings))
}

fn resolve_jellyfin(
    env: &EnvConfig,
    file: FileJellyfinConfig,
) -> Result<Option<JellyfinConfig>, ConfigLoadError> {
    let Some(url) = env.jellyfin_url.clone().or(non_blank(file.url)) else {
        return Ok(None);
    };
    let api_key = env
        .jellyfin_api_key
        .clone()
        .or(non_blank(file.api_key))
        .ok_or(ConfigLoadError::MissingJellyfinApiKey)?;

    Ok(Some(JellyfinConfig {
        url: url.trim_end_matches('/').to_string(),
        api_key,
        timeout_secs: env
            .jellyfin_timeout_secs
            .or(file.timeout_secs)
            .unwrap_or(DEFAULT_JELLYFIN_TIMEOUT_SECS),
    }))
}
