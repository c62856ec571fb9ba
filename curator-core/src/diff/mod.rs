//! Field-level metadata diffing.
//!
//! Every function here is pure: identical inputs produce identical output,
//! which the preview/execute contract depends on.

pub mod canonical;

use curator_model::{
    ChangeType, DiffSummary, FieldChange, ItemDiff, ItemId, ItemMetadata, MetadataField,
};
use rayon::prelude::*;

use self::canonical::{canonicalize, optional_equal};

/// One `(current, proposed)` pair for bulk diffing.
#[derive(Debug, Clone)]
pub struct DiffInput {
    pub item_id: ItemId,
    pub current: ItemMetadata,
    pub proposed: ItemMetadata,
}

/// Classify every content field, `unchanged` entries included.
pub fn classify_fields(current: &ItemMetadata, proposed: &ItemMetadata) -> Vec<FieldChange> {
    MetadataField::ALL
        .into_iter()
        .map(|field| {
            let kind = field.kind();
            let before = canonicalize(kind, current.value_of(field));
            let after = canonicalize(kind, proposed.value_of(field));

            let change_type = match (&before, &after) {
                (None, None) => ChangeType::Unchanged,
                (None, Some(_)) => ChangeType::Added,
                (Some(_), None) => ChangeType::Removed,
                (Some(b), Some(a)) if optional_equal(Some(b), Some(a)) => {
                    ChangeType::Unchanged
                }
                (Some(_), Some(_)) => ChangeType::Modified,
            };

            FieldChange {
                field: field.as_str().to_string(),
                change_type,
                has_conflict: change_type != ChangeType::Unchanged
                    && current.is_locked(field),
                before,
                after,
            }
        })
        .collect()
}

/// Compare two snapshots of one item. `unchanged` fields are dropped and
/// changes to fields locked in Jellyfin are flagged as conflicts.
pub fn compute_diff(
    current: &ItemMetadata,
    proposed: &ItemMetadata,
    item_id: ItemId,
) -> ItemDiff {
    let changes = classify_fields(current, proposed)
        .into_iter()
        .filter(|change| change.change_type != ChangeType::Unchanged)
        .collect();
    ItemDiff::new(item_id, changes)
}

/// Diff a batch. Items are independent; output order matches input order.
pub fn compute_bulk_diff(inputs: &[DiffInput]) -> Vec<ItemDiff> {
    inputs
        .par_iter()
        .map(|input| compute_diff(&input.current, &input.proposed, input.item_id))
        .collect()
}

pub fn diff_summary(diffs: &[ItemDiff]) -> DiffSummary {
    let mut summary = DiffSummary {
        total_items: diffs.len(),
        ..DiffSummary::default()
    };

    for diff in diffs {
        if diff.has_changes {
            summary.items_with_changes += 1;
        }
        if diff.has_conflicts() {
            summary.items_with_conflicts += 1;
        }
        for change in &diff.changes {
            *summary.field_counts.entry(change.field.clone()).or_default() += 1;
        }
    }

    summary
}
