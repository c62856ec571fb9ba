//! External metadata providers behind a capability-flag interface.

pub mod tvmaze;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use curator_model::{
    Capability, ItemType, ProviderArtwork, ProviderCapabilities, ProviderEpisode, ProviderInfo,
    ProviderMetadata, ProviderSearchResult,
};

pub use tvmaze::TvMazeProvider;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Not found")]
    NotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("{provider} does not support {capability:?}")]
    Unsupported {
        provider: &'static str,
        capability: Capability,
    },
}

/// A metadata source. Operations outside [`MetadataProvider::capabilities`]
/// return [`ProviderError::Unsupported`].
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn capabilities(&self) -> ProviderCapabilities;

    async fn search(
        &self,
        _query: &str,
        _item_type: Option<ItemType>,
    ) -> Result<Vec<ProviderSearchResult>, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: self.name(),
            capability: Capability::Search,
        })
    }

    async fn metadata(&self, _external_id: &str) -> Result<ProviderMetadata, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: self.name(),
            capability: Capability::Metadata,
        })
    }

    async fn artwork(&self, _external_id: &str) -> Result<Vec<ProviderArtwork>, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: self.name(),
            capability: Capability::Artwork,
        })
    }

    async fn episodes(&self, _external_id: &str) -> Result<Vec<ProviderEpisode>, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: self.name(),
            capability: Capability::Episodes,
        })
    }
}

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later registrations with the same name replace earlier ones.
    pub fn register(&mut self, provider: Arc<dyn MetadataProvider>) {
        self.providers.retain(|existing| existing.name() != provider.name());
        self.providers.push(provider);
    }

    pub fn list(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|provider| ProviderInfo {
                name: provider.name().to_string(),
                capabilities: provider.capabilities(),
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn MetadataProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn with_capability(&self, capability: Capability) -> Vec<Arc<dyn MetadataProvider>> {
        self.providers
            .iter()
            .filter(|provider| provider.capabilities().supports(capability))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ArtworkOnly;

    #[async_trait]
    impl MetadataProvider for ArtworkOnly {
        fn name(&self) -> &'static str {
            "posters"
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                artwork: true,
                ..Default::default()
            }
        }

        async fn artwork(&self, external_id: &str) -> Result<Vec<ProviderArtwork>, ProviderError> {
            Ok(vec![ProviderArtwork {
                kind: "poster".into(),
                url: format!("https://img.example/{external_id}.jpg"),
            }])
        }
    }

    #[tokio::test]
    async fn undeclared_operations_are_unsupported() {
        let provider = ArtworkOnly;
        assert_eq!(provider.artwork("42").await.unwrap().len(), 1);
        let err = provider.search("heat", None).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Unsupported {
                capability: Capability::Search,
                ..
            }
        ));
    }

    #[test]
    fn registry_filters_by_capability() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(ArtworkOnly));
        registry.register(Arc::new(
            TvMazeProvider::new(std::time::Duration::from_secs(1)).unwrap(),
        ));

        let artwork: Vec<_> = registry
            .with_capability(Capability::Artwork)
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(artwork, vec!["posters"]);
        assert_eq!(registry.with_capability(Capability::Episodes).len(), 1);
        assert!(registry.get("TVMaze").is_some());
        assert_eq!(registry.list().len(), 2);
    }
}
