use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::{DiffSummary, ItemDiff};
use crate::ids::{ItemId, JobId, LibraryId};
use crate::item::{ItemType, Person};
use crate::jobs::{Job, JobStatus, OperationLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulkOperationType {
    UpdateMetadata,
}

/// Item selection for a bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OperationScope {
    Items {
        item_ids: Vec<ItemId>,
    },
    Library {
        library_id: LibraryId,
        #[serde(default)]
        item_types: Vec<ItemType>,
    },
    Search {
        query: String,
        #[serde(default)]
        library_id: Option<LibraryId>,
        #[serde(default)]
        item_types: Vec<ItemType>,
    },
}

/// Requested content changes, applied identically to every item in scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub official_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premiere_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community_rating: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub studios: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people: Option<Vec<Person>>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_genres: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_genres: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_studios: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_studios: Vec<String>,

    /// Merged into the existing map; a `null` value removes the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_ids: Option<BTreeMap<String, Option<String>>>,

    /// Wire names of fields to clear
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub clear_fields: Vec<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        *self == MetadataPatch::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    #[serde(rename = "type")]
    pub operation_type: BulkOperationType,
    pub scope: OperationScope,
    pub changes: MetadataPatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPreviewResponse {
    pub preview_token: String,
    pub total_items: usize,
    pub estimated_api_calls: usize,
    pub changes: Vec<ItemDiff>,
    pub summary: DiffSummary,
    /// Explicitly requested ids with no matching item
    #[serde(default)]
    pub missing_item_ids: Vec<ItemId>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub preview_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Rough wall-clock estimate in seconds
    pub estimated_duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusResponse {
    #[serde(flatten)]
    pub job: Job,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_logs: Option<Vec<OperationLog>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_is_tagged_by_kind() {
        let scope: OperationScope = serde_json::from_value(serde_json::json!({
            "kind": "library",
            "libraryId": "0190a7a2-8f6e-7c3a-9d55-3c1f0a2b4c5d",
            "itemTypes": ["Episode"]
        }))
        .unwrap();
        match scope {
            OperationScope::Library { item_types, .. } => {
                assert_eq!(item_types, vec![ItemType::Episode]);
            }
            other => panic!("unexpected scope {other:?}"),
        }
    }

    #[test]
    fn provider_id_null_survives_deserialization() {
        let patch: MetadataPatch = serde_json::from_value(serde_json::json!({
            "providerIds": { "Tvdb": null, "Imdb": "tt0903747" }
        }))
        .unwrap();
        let ids = patch.provider_ids.unwrap();
        assert_eq!(ids.get("Tvdb"), Some(&None));
        assert_eq!(ids.get("Imdb"), Some(&Some("tt0903747".to_string())));
    }

    #[test]
    fn default_patch_is_empty() {
        assert!(MetadataPatch::default().is_empty());
        let patch = MetadataPatch {
            add_tags: vec!["4k".into()],
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
