pub mod v1;

use axum::{Router, http::HeaderValue, routing::get};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::health::health_handler;
use crate::infra::app_state::AppState;

/// Create the main API router with all versions
pub fn create_api_router() -> Router<AppState> {
    Router::new().nest("/api/v1", v1::create_v1_router())
}

/// Full application: health, versioned API, CORS and request tracing.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state);

    Router::new()
        .route("/health", get(health_handler))
        .merge(create_api_router())
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(state: &AppState) -> CorsLayer {
    let cors = &state.config().cors;
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if cors.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
