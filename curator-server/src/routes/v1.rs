use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{misclassifications, operations, providers, sync};
use crate::infra::app_state::AppState;

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .merge(create_operation_routes())
        .merge(create_misclassification_routes())
        .route("/sync", post(sync::sync_handler))
        .route("/providers", get(providers::list_providers_handler))
        .route(
            "/providers/{name}/search",
            get(providers::search_provider_handler),
        )
}

fn create_operation_routes() -> Router<AppState> {
    Router::new()
        .route("/operations/preview", post(operations::preview_handler))
        .route("/operations/execute", post(operations::execute_handler))
        .route("/operations/jobs", get(operations::list_jobs_handler))
        .route("/operations/jobs/{id}", get(operations::get_job_handler))
}

fn create_misclassification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/misclassifications",
            get(misclassifications::list_flagged_handler)
                .delete(misclassifications::dismiss_all_handler),
        )
        .route(
            "/misclassifications/scan",
            post(misclassifications::scan_handler),
        )
        .route(
            "/misclassifications/items/{id}/analyze",
            post(misclassifications::analyze_item_handler),
        )
        .route(
            "/misclassifications/items/{id}",
            axum::routing::delete(misclassifications::dismiss_item_handler),
        )
}
