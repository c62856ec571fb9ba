use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::ItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub before: Option<Value>,
    pub after: Option<Value>,
    #[serde(default)]
    pub has_conflict: bool,
}

/// Field-level comparison of two snapshots of one item.
///
/// `changes` never contains `unchanged` entries and `conflicts` is the
/// subset of `changes` whose `has_conflict` flag is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDiff {
    pub item_id: ItemId,
    pub changes: Vec<FieldChange>,
    pub conflicts: Vec<FieldChange>,
    pub has_changes: bool,
}

impl ItemDiff {
    pub fn new(item_id: ItemId, changes: Vec<FieldChange>) -> Self {
        let conflicts = changes
            .iter()
            .filter(|change| change.has_conflict)
            .cloned()
            .collect();
        let has_changes = !changes.is_empty();
        Self {
            item_id,
            changes,
            conflicts,
            has_changes,
        }
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub total_items: usize,
    pub items_with_changes: usize,
    pub items_with_conflicts: usize,
    /// Changed-field histogram keyed by wire field name
    pub field_counts: BTreeMap<String, usize>,
}
