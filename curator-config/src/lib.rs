//! Configuration loading for Curator.
//!
//! Values are layered lowest to highest: built-in defaults, an optional TOML
//! file, then environment variables (optionally seeded from a `.env` file).
//! Guard rails reject unusable values and surface soft problems as warnings.

pub mod loader;
pub mod models;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::sources::{EnvConfig, FileConfig};
pub use models::{
    Config, ConfigMetadata, CorsConfig, DatabaseConfig, JellyfinConfig, OperationsConfig,
    ProvidersConfig, ScanConfig, ServerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
