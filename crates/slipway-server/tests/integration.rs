use axum::http::StatusCode;
use http_body_util::BodyExt;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use unit_runner::Supervisor;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn demo_stack() -> slipway_core::StackConfig {
    serde_yaml::from_str(
        "name: demo-stack\nunits:\n  app:\n    image: app:latest\n    depends_on:\n      postgres:\n        condition: unit_healthy\n  postgres:\n    image: postgres:15\n    healthcheck:\n      probe:\n        type: command\n        argv: [pg_isready]\n",
    )
    .unwrap()
}

fn router(dir: &TempDir) -> axum::Router {
    let supervisor = Arc::new(Supervisor::new(demo_stack(), dir.path()));
    slipway_server::build_router(supervisor)
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_stack_name() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(router(&dir), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "demo-stack");
}

// ---------------------------------------------------------------------------
// /api/stack
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stack_returns_definition() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(router(&dir), "/api/stack").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "demo-stack");
    assert!(body["units"]["postgres"]["healthcheck"].is_object());
    assert_eq!(
        body["units"]["app"]["depends_on"]["postgres"]["condition"],
        "unit_healthy"
    );
}

#[tokio::test]
async fn stack_status_lists_units_in_start_order() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(router(&dir), "/api/stack/status").await;
    assert_eq!(status, StatusCode::OK);
    let units = body["units"].as_array().unwrap();
    assert_eq!(units[0]["name"], "postgres");
    assert_eq!(units[1]["name"], "app");
    assert!(units.iter().all(|u| u["state"] == "pending"));
}

// ---------------------------------------------------------------------------
// /api/units
// ---------------------------------------------------------------------------

#[tokio::test]
async fn units_list_pending_before_up() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(router(&dir), "/api/units").await;
    assert_eq!(status, StatusCode::OK);
    let units = body.as_array().unwrap();
    assert_eq!(units.len(), 2);
    assert!(units.iter().all(|u| u["state"] == "pending"));
}

#[tokio::test]
async fn unit_detail_includes_config() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(router(&dir), "/api/units/postgres").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "postgres");
    assert_eq!(body["config"]["image"], "postgres:15");
}

#[tokio::test]
async fn unknown_unit_is_404() {
    let dir = TempDir::new().unwrap();
    let (status, body) = get(router(&dir), "/api/units/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let dir = TempDir::new().unwrap();
    let (status, _) = get(router(&dir), "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
