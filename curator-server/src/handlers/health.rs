use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use crate::infra::app_state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": if config.database.url.is_some() { "postgres" } else { "memory" },
        "jellyfin": config.jellyfin.is_some(),
        "providers": state.providers.list().len(),
    }))
}
