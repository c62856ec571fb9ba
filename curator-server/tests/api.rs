use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use curator_config::Config;
use curator_model::{Item, ItemType, Library, LibraryId};
use curator_server::{AppParts, AppState, create_app};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

struct TestApp {
    server: TestServer,
    state: AppState,
    library: LibraryId,
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.operations.batch_size = 2;
    config.operations.batch_delay_ms = 0;
    config
}

async fn build_test_app() -> Result<TestApp> {
    let state = AppState::new(test_config(), AppParts::in_memory(), CancellationToken::new());
    let library = state
        .stores
        .libraries
        .upsert(Library::new("jf-lib-tv", "Shows"))
        .await?;

    let server = TestServer::new(create_app(state.clone()))
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(TestApp {
        server,
        state,
        library: library.id,
    })
}

async fn seed(app: &TestApp, jellyfin_id: &str, name: &str, item_type: ItemType) -> Result<Item> {
    let item = Item::new(app.library, jellyfin_id, name, item_type);
    Ok(app.state.stores.items.upsert(item).await?)
}

#[tokio::test]
async fn health_reports_backends() -> Result<()> {
    let app = build_test_app().await?;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["jellyfin"], false);
    Ok(())
}

#[tokio::test]
async fn preview_then_execute_updates_items() -> Result<()> {
    let app = build_test_app().await?;
    let pilot = seed(&app, "jf-1", "Pilot", ItemType::Episode).await?;
    let second = seed(&app, "jf-2", "Second", ItemType::Episode).await?;

    let preview = app
        .server
        .post("/api/v1/operations/preview")
        .json(&json!({
            "type": "updateMetadata",
            "scope": { "kind": "items", "itemIds": [pilot.id, second.id] },
            "changes": { "overview": "Reviewed", "addTags": ["curated"] }
        }))
        .await;
    preview.assert_status_ok();
    let preview: Value = preview.json();
    assert_eq!(preview["totalItems"], 2);
    assert_eq!(preview["estimatedApiCalls"], 2);
    assert_eq!(preview["summary"]["fieldCounts"]["overview"], 2);
    let token = preview["previewToken"]
        .as_str()
        .expect("previewToken present")
        .to_string();

    // Preview never writes.
    let untouched = app.state.stores.items.get(pilot.id).await?.expect("pilot");
    assert!(untouched.overview.is_none());

    let execute = app
        .server
        .post("/api/v1/operations/execute")
        .json(&json!({ "previewToken": token }))
        .await;
    execute.assert_status(StatusCode::ACCEPTED);
    let execute: Value = execute.json();
    assert_eq!(execute["status"], "pending");
    let job_id = execute["jobId"].as_str().expect("jobId").to_string();

    app.state.runner().wait_idle().await;

    let job = app
        .server
        .get(&format!("/api/v1/operations/jobs/{job_id}"))
        .add_query_param("includeDetails", "true")
        .await;
    job.assert_status_ok();
    let job: Value = job.json();
    assert_eq!(job["status"], "completed");
    assert_eq!(job["itemsProcessed"], 2);
    assert_eq!(job["itemsFailed"], 0);
    assert_eq!(job["operationLogs"].as_array().map(Vec::len), Some(2));

    let without_details: Value = app
        .server
        .get(&format!("/api/v1/operations/jobs/{job_id}"))
        .await
        .json();
    assert!(without_details.get("operationLogs").is_none());

    let updated = app.state.stores.items.get(pilot.id).await?.expect("pilot");
    assert_eq!(updated.overview.as_deref(), Some("Reviewed"));
    assert_eq!(updated.tags, vec!["curated".to_string()]);

    // Tokens are single use.
    let replay = app
        .server
        .post("/api/v1/operations/execute")
        .json(&json!({ "previewToken": token }))
        .await;
    replay.assert_status(StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn errors_render_as_json_envelope() -> Result<()> {
    let app = build_test_app().await?;

    let response = app
        .server
        .post("/api/v1/operations/execute")
        .json(&json!({ "previewToken": "not-a-token" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["status"], 404);
    assert!(body["error"]["message"].is_string());

    let empty_patch = app
        .server
        .post("/api/v1/operations/preview")
        .json(&json!({
            "type": "updateMetadata",
            "scope": { "kind": "library", "libraryId": app.library },
            "changes": {}
        }))
        .await;
    empty_patch.assert_status(StatusCode::BAD_REQUEST);

    let missing_job = app
        .server
        .get("/api/v1/operations/jobs/0190a7a2-8f6e-7c3a-9d55-3c1f0a2b4c5d")
        .await;
    missing_job.assert_status(StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn job_listing_caps_limit_and_validates_filters() -> Result<()> {
    let app = build_test_app().await?;

    let response = app
        .server
        .get("/api/v1/operations/jobs")
        .add_query_param("limit", "500")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["limit"], 100);
    assert_eq!(body["jobs"], json!([]));

    let bad_status = app
        .server
        .get("/api/v1/operations/jobs")
        .add_query_param("status", "exploded")
        .await;
    bad_status.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn scan_flags_and_dismisses_misfiled_items() -> Result<()> {
    let app = build_test_app().await?;
    let misfiled = seed(&app, "jf-m", "Show.S01E05.mkv", ItemType::Movie).await?;
    seed(&app, "jf-ok", "Heat", ItemType::Movie).await?;

    let scan = app
        .server
        .post("/api/v1/misclassifications/scan")
        .add_query_param("library", app.library)
        .add_query_param("types", "Movie")
        .await;
    scan.assert_status_ok();
    let scan: Value = scan.json();
    assert_eq!(scan["itemsScanned"], 2);
    assert_eq!(scan["misclassifiedItems"], 1);
    assert_eq!(scan["highConfidenceIssues"], 1);
    assert_eq!(scan["cancelled"], false);

    let listed: Value = app
        .server
        .get("/api/v1/misclassifications")
        .add_query_param("library", app.library)
        .await
        .json();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["name"], "Show.S01E05.mkv");
    assert_eq!(listed["items"][0]["maxSeverity"], "high");

    let low_only: Value = app
        .server
        .get("/api/v1/misclassifications")
        .add_query_param("severity", "low")
        .await
        .json();
    assert_eq!(low_only["total"], 0);

    let dismissed = app
        .server
        .delete(&format!("/api/v1/misclassifications/items/{}", misfiled.id))
        .await;
    dismissed.assert_status_ok();
    assert_eq!(dismissed.json::<Value>()["dismissed"], 1);

    let after: Value = app.server.get("/api/v1/misclassifications").await.json();
    assert_eq!(after["total"], 0);
    Ok(())
}

#[tokio::test]
async fn analyze_item_respects_persist_flag() -> Result<()> {
    let app = build_test_app().await?;
    let misfiled = seed(&app, "jf-m", "Show.S01E05.mkv", ItemType::Movie).await?;
    let path = format!("/api/v1/misclassifications/items/{}/analyze", misfiled.id);

    let dry_run = app.server.post(&path).await;
    dry_run.assert_status_ok();
    let analysis: Value = dry_run.json();
    assert_eq!(analysis["suggestedType"], "Episode");
    assert_eq!(analysis["needsReview"], true);
    let stored = app.state.stores.items.get(misfiled.id).await?.expect("item");
    assert!(!stored.suspected_misclassification);

    app.server
        .post(&path)
        .add_query_param("persist", "true")
        .await
        .assert_status_ok();
    let stored = app.state.stores.items.get(misfiled.id).await?.expect("item");
    assert!(stored.suspected_misclassification);

    let cleared: Value = app
        .server
        .delete("/api/v1/misclassifications")
        .add_query_param("library", app.library)
        .await
        .json();
    assert_eq!(cleared["dismissed"], 1);
    Ok(())
}

#[tokio::test]
async fn scan_rejects_unknown_types() -> Result<()> {
    let app = build_test_app().await?;

    let response = app
        .server
        .post("/api/v1/misclassifications/scan")
        .add_query_param("types", "Trailer")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn sync_and_providers_degrade_without_integrations() -> Result<()> {
    let app = build_test_app().await?;

    app.server
        .post("/api/v1/sync")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let providers = app.server.get("/api/v1/providers").await;
    providers.assert_status_ok();
    assert_eq!(providers.json::<Value>(), json!([]));

    app.server
        .get("/api/v1/providers/tvmaze/search")
        .add_query_param("q", "Severance")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    Ok(())
}
