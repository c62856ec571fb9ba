use axum::{extract::State, response::Json};
use curator_model::SyncReport;

use crate::infra::app_state::AppState;
use crate::infra::errors::{AppError, AppResult};

pub async fn sync_handler(State(state): State<AppState>) -> AppResult<Json<SyncReport>> {
    let sync = state
        .sync
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("Jellyfin is not configured"))?;
    let report = sync.sync_all().await?;
    Ok(Json(report))
}
