//! Welcome and health endpoints.

mod common;

use axum::http::StatusCode;

use common::TestApp;

#[tokio::test]
async fn root_returns_welcome() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to Agentmart API");
}

#[tokio::test]
async fn health_reports_store() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app_status"], "healthy");
    assert_eq!(body["db_status"], "connected");
    assert_eq!(body["store"]["backend"], "memory");
    assert_eq!(body["version"], agentmart_core::version());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app.send_raw("GET", "/api/v1/nothing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
