use std::collections::HashSet;

use curator_model::{ItemId, OperationScope};

use crate::database::{ItemFilter, ItemOrder, ItemRepository, Page};
use crate::error::{CuratorError, Result};

/// A scope turned into a concrete, ordered id list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedScope {
    /// Every id the operation will attempt, in scope order. Explicit ids
    /// that do not exist stay in the list so execute can log them.
    pub item_ids: Vec<ItemId>,
    /// Explicit ids with no matching item
    pub missing_item_ids: Vec<ItemId>,
}

pub async fn resolve_scope(
    items: &dyn ItemRepository,
    scope: &OperationScope,
    max_items: usize,
) -> Result<ResolvedScope> {
    let filter = match scope {
        OperationScope::Items { item_ids } => {
            return resolve_explicit(items, item_ids, max_items).await;
        }
        OperationScope::Library {
            library_id,
            item_types,
        } => ItemFilter::new().library(Some(*library_id)).types(item_types),
        OperationScope::Search {
            query,
            library_id,
            item_types,
        } => {
            let query = query.trim();
            if query.is_empty() {
                return Err(CuratorError::validation("search scope needs a query"));
            }
            ItemFilter::new()
                .search(query)
                .library(*library_id)
                .types(item_types)
        }
    };

    let found = items
        .find(
            &filter,
            Page::new(0, max_items as u64 + 1),
            ItemOrder::CreatedAsc,
        )
        .await?;
    if found.len() > max_items {
        return Err(too_large(max_items));
    }

    Ok(ResolvedScope {
        item_ids: found.into_iter().map(|item| item.id).collect(),
        missing_item_ids: Vec::new(),
    })
}

async fn resolve_explicit(
    items: &dyn ItemRepository,
    requested: &[ItemId],
    max_items: usize,
) -> Result<ResolvedScope> {
    if requested.is_empty() {
        return Err(CuratorError::validation("item scope needs at least one id"));
    }

    let mut seen = HashSet::with_capacity(requested.len());
    let item_ids: Vec<ItemId> = requested
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    if item_ids.len() > max_items {
        return Err(too_large(max_items));
    }

    let found: HashSet<ItemId> = items
        .get_many(&item_ids)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();
    let missing_item_ids = item_ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect();

    Ok(ResolvedScope {
        item_ids,
        missing_item_ids,
    })
}

fn too_large(max_items: usize) -> CuratorError {
    CuratorError::validation(format!(
        "scope resolves to more than {max_items} items; narrow the filter"
    ))
}
