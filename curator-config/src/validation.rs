use thiserror::Error;
use url::Url;

use crate::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
    #[error("invalid Jellyfin URL `{url}`: {source}")]
    InvalidJellyfinUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Jellyfin URL `{url}` must use http or https")]
    UnsupportedJellyfinScheme { url: String },
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    let required: [(&'static str, u64); 7] = [
        ("operations.preview_ttl_secs", config.operations.preview_ttl_secs),
        ("operations.batch_size", config.operations.batch_size as u64),
        ("operations.max_concurrent_jobs", config.operations.max_concurrent_jobs as u64),
        ("operations.max_scope_items", config.operations.max_scope_items as u64),
        ("scan.batch_size", config.scan.batch_size as u64),
        ("database.max_connections", u64::from(config.database.max_connections)),
        ("providers.timeout_secs", config.providers.timeout_secs),
    ];
    if let Some(&(field, _)) = required.iter().find(|(_, value)| *value == 0) {
        return Err(ConfigGuardRailError::ZeroValue { field });
    }

    if config.database.url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured; using in-memory stores",
            "Set DATABASE_URL or [database].url to persist items and jobs",
        );
    }

    match &config.jellyfin {
        Some(jellyfin) => {
            if jellyfin.timeout_secs == 0 {
                return Err(ConfigGuardRailError::ZeroValue {
                    field: "jellyfin.timeout_secs",
                });
            }
            let parsed = Url::parse(&jellyfin.url).map_err(|source| {
                ConfigGuardRailError::InvalidJellyfinUrl {
                    url: jellyfin.url.clone(),
                    source,
                }
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigGuardRailError::UnsupportedJellyfinScheme {
                    url: jellyfin.url.clone(),
                });
            }
        }
        None => warnings.push_with_hint(
            "Jellyfin not configured; bulk operations will only update local records",
            "Set JELLYFIN_URL and JELLYFIN_API_KEY to write changes back",
        ),
    }

    if config.operations.batch_delay_ms == 0 {
        warnings.push(
            "operations.batch_delay_ms is 0; bulk jobs will not pace Jellyfin writes",
        );
    }

    if config.cors.allows_any() {
        warnings.push_with_hint(
            "CORS allows any origin",
            "Set CURATOR_CORS_ORIGINS to restrict browser access",
        );
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JellyfinConfig;

    #[test]
    fn zero_batch_is_rejected() {
        let mut config = Config::default();
        config.scan.batch_size = 0;
        let err = apply_guard_rails(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigGuardRailError::ZeroValue { field: "scan.batch_size" }
        ));
    }

    #[test]
    fn jellyfin_scheme_is_checked() {
        let mut config = Config::default();
        config.jellyfin = Some(JellyfinConfig {
            url: "ftp://media.local".into(),
            api_key: "key".into(),
            timeout_secs: 5,
        });
        assert!(matches!(
            apply_guard_rails(&config),
            Err(ConfigGuardRailError::UnsupportedJellyfinScheme { .. })
        ));
    }

    #[test]
    fn defaults_only_warn() {
        let warnings = apply_guard_rails(&Config::default()).unwrap();
        let messages: Vec<_> =
            warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("in-memory")));
        assert!(messages.iter().any(|m| m.contains("Jellyfin not configured")));
    }
}
