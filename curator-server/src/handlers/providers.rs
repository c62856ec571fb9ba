use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use curator_model::{ItemType, ProviderInfo, ProviderSearchResult};
use serde::Deserialize;

use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct ProviderSearchQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<String>,
}

pub async fn list_providers_handler(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    Json(state.providers.list())
}

pub async fn search_provider_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProviderSearchQuery>,
) -> AppResult<Json<Vec<ProviderSearchResult>>> {
    let provider = state
        .providers
        .get(&name)
        .ok_or_else(|| AppError::not_found(format!("provider {name}")))?;

    let term = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .ok_or_else(|| AppError::bad_request("q is required"))?;
    let item_type = query
        .item_type
        .as_deref()
        .map(ItemType::from_str)
        .transpose()?;

    let results = provider.search(term, item_type).await?;
    Ok(Json(results))
}
