use async_trait::async_trait;
use curator_model::ItemMetadata;

use super::JellyfinError;

/// The external write the bulk pipeline performs after the local store has
/// been updated. Failures are reported, never fatal to the item.
#[async_trait]
pub trait MetadataSink: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn write_metadata(
        &self,
        jellyfin_id: &str,
        metadata: &ItemMetadata,
    ) -> Result<(), JellyfinError>;
}

/// Used when no Jellyfin server is configured; local edits only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSink;

#[async_trait]
impl MetadataSink for DisabledSink {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn write_metadata(
        &self,
        _jellyfin_id: &str,
        _metadata: &ItemMetadata,
    ) -> Result<(), JellyfinError> {
        Ok(())
    }
}
