use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use curator_core::ScanRequest;
use curator_core::database::{ItemFilter, ItemOrder, Page};
use curator_model::{
    FlaggedItem, FlaggedItemsResponse, ItemId, LibraryId, MisclassificationAnalysis,
    ScanResult, Severity,
};
use serde::{Deserialize, Serialize};

use crate::handlers::{page_limit, parse_item_types};
use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

const DEFAULT_FLAGGED_PAGE: u64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    pub library: Option<LibraryId>,
    pub types: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FlaggedQuery {
    pub library: Option<LibraryId>,
    pub severity: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub persist: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct DismissQuery {
    pub library: Option<LibraryId>,
}

#[derive(Debug, Serialize)]
pub struct DismissResponse {
    pub dismissed: u64,
}

/// Runs to completion inside the request. Process shutdown cancels it and
/// the partial result is returned.
pub async fn scan_handler(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> AppResult<Json<ScanResult>> {
    let request = ScanRequest {
        library_id: query.library,
        item_types: parse_item_types(query.types.as_deref())?,
    };
    let cancel = state.shutdown.child_token();
    let result = state.scanner.scan(&request, &cancel).await?;
    Ok(Json(result))
}

pub async fn list_flagged_handler(
    State(state): State<AppState>,
    Query(query): Query<FlaggedQuery>,
) -> AppResult<Json<FlaggedItemsResponse>> {
    let severity = query
        .severity
        .as_deref()
        .map(Severity::from_str)
        .transpose()?;
    let limit = page_limit(query.limit, DEFAULT_FLAGGED_PAGE);
    let offset = query.offset.unwrap_or(0);

    let filter = ItemFilter::new()
        .library(query.library)
        .flagged(true)
        .max_severity(severity);
    let total = state.stores.items.count(&filter).await?;
    let items = state
        .stores
        .items
        .find(&filter, Page::new(offset, limit), ItemOrder::ScoreDesc)
        .await?;

    Ok(Json(FlaggedItemsResponse {
        items: items.iter().map(FlaggedItem::from_item).collect(),
        total,
        limit: u32::try_from(limit).unwrap_or(u32::MAX),
        offset: u32::try_from(offset).unwrap_or(u32::MAX),
    }))
}

pub async fn analyze_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
    Query(query): Query<AnalyzeQuery>,
) -> AppResult<Json<MisclassificationAnalysis>> {
    let analysis = state.scanner.analyze_item(item_id, query.persist).await?;
    Ok(Json(analysis))
}

pub async fn dismiss_item_handler(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
) -> AppResult<Json<DismissResponse>> {
    if state.stores.items.get(item_id).await?.is_none() {
        return Err(AppError::not_found(format!("item {item_id}")));
    }
    let dismissed = state
        .scanner
        .dismiss(&ItemFilter::new().ids(vec![item_id]))
        .await?;
    Ok(Json(DismissResponse { dismissed }))
}

pub async fn dismiss_all_handler(
    State(state): State<AppState>,
    Query(query): Query<DismissQuery>,
) -> AppResult<Json<DismissResponse>> {
    let dismissed = state
        .scanner
        .dismiss(&ItemFilter::new().library(query.library))
        .await?;
    Ok(Json(DismissResponse { dismissed }))
}
