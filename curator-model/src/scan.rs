use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, LibraryId};
use crate::item::{Item, ItemType};
use crate::misclassification::{Reason, Severity};

/// Aggregate outcome of a misclassification scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub total_items: u64,
    pub items_scanned: u64,
    pub failed_items: u64,
    pub misclassified_items: u64,
    pub high_confidence_issues: u64,
    pub medium_confidence_issues: u64,
    pub low_confidence_issues: u64,
    /// Milliseconds
    pub duration: u64,
    pub cancelled: bool,
}

impl ScanResult {
    pub fn record_severity(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high_confidence_issues += 1,
            Severity::Medium => self.medium_confidence_issues += 1,
            Severity::Low => self.low_confidence_issues += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedItem {
    pub id: ItemId,
    pub jellyfin_id: String,
    pub library_id: LibraryId,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub path: Option<String>,
    pub score: f64,
    pub max_severity: Option<Severity>,
    pub reasons: Vec<Reason>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl FlaggedItem {
    pub fn from_item(item: &Item) -> Self {
        Self {
            id: item.id,
            jellyfin_id: item.jellyfin_id.clone(),
            library_id: item.library_id,
            name: item.name.clone(),
            item_type: item.item_type,
            path: item.path.clone(),
            score: item.misclassification_score.unwrap_or_default(),
            max_severity: item.max_reason_severity(),
            reasons: item.misclassification_reasons.clone(),
            checked_at: item.misclassification_checked_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedItemsResponse {
    pub items: Vec<FlaggedItem>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// Outcome of pulling libraries and items from Jellyfin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub libraries: u64,
    pub items_synced: u64,
    pub items_failed: u64,
    /// Milliseconds
    pub duration: u64,
}
