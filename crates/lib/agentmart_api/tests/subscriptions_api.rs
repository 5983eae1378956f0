//! Subscription endpoint tests.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::*;

async fn subscribe(app: &TestApp, token: &str, agent_id: &Value) -> (StatusCode, Value) {
    app.send(
        "POST",
        "/api/v1/subscriptions/subscribe",
        Some(token),
        Some(json!({ "agent_id": agent_id })),
    )
    .await
}

#[tokio::test]
async fn subscribe_fills_defaults_for_caller() {
    let app = TestApp::new();
    let agent = app.create_agent("Writer").await;

    let (status, sub) = app
        .send(
            "POST",
            "/api/v1/subscriptions/subscribe",
            Some(&member()),
            Some(json!({ "agent_id": agent["id"], "user_id": OTHER })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{sub}");
    assert_eq!(sub["user_id"], MEMBER);
    assert_eq!(sub["agent_id"], agent["id"]);
    assert_eq!(sub["purchase_modality"], "default");
    assert_eq!(sub["ownership_status"], "active");
    assert!(sub["purchase_date"].is_string());
    assert!(sub["expiry_date"].is_null());
}

#[tokio::test]
async fn second_active_subscription_is_rejected() {
    let app = TestApp::new();
    let agent = app.create_agent("Writer").await;

    let (status, _) = subscribe(&app, &member(), &agent["id"]).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = subscribe(&app, &member(), &agent["id"]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["detail"],
        "User already has an active subscription for this agent"
    );

    // Another user is unaffected.
    let (status, _) = subscribe(&app, &other(), &agent["id"]).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn overlong_modality_is_unprocessable() {
    let app = TestApp::new();
    let agent = app.create_agent("Writer").await;
    let (status, body) = app
        .send(
            "POST",
            "/api/v1/subscriptions/subscribe",
            Some(&member()),
            Some(json!({ "agent_id": agent["id"], "purchase_modality": "m".repeat(51) })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["detail"],
        "purchase_modality must be at most 50 characters"
    );
}

#[tokio::test]
async fn subscribing_to_unknown_agent_is_not_found() {
    let app = TestApp::new();
    let (status, body) = subscribe(
        &app,
        &member(),
        &json!("00000000-0000-0000-0000-000000000000"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Agent not found");
}

#[tokio::test]
async fn subscription_routes_require_bearer() {
    let app = TestApp::new();
    let (status, body) = app
        .send("GET", "/api/v1/subscriptions/user-subscriptions", None, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Not authenticated");
}

#[tokio::test]
async fn user_subscriptions_lists_active_with_agent_details() {
    let app = TestApp::new();
    let writer = app.create_agent("Writer").await;
    let reviewer = app.create_agent("Reviewer").await;

    subscribe(&app, &member(), &writer["id"]).await;
    let (_, dropped) = subscribe(&app, &member(), &reviewer["id"]).await;
    subscribe(&app, &other(), &reviewer["id"]).await;

    let uri = format!(
        "/api/v1/subscriptions/unsubscribe/{}",
        dropped["id"].as_str().unwrap()
    );
    let (status, _) = app.send("POST", &uri, Some(&member()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = app
        .send(
            "GET",
            "/api/v1/subscriptions/user-subscriptions",
            Some(&member()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["agent_id"], writer["id"]);
    assert_eq!(list[0]["agent_name"], "Writer");
    assert_eq!(list[0]["agent_title"], "Writer title");
}

#[tokio::test]
async fn unsubscribe_closes_subscription_once() {
    let app = TestApp::new();
    let agent = app.create_agent("Writer").await;
    let (_, sub) = subscribe(&app, &member(), &agent["id"]).await;
    let uri = format!(
        "/api/v1/subscriptions/unsubscribe/{}",
        sub["id"].as_str().unwrap()
    );

    let (status, closed) = app.send("POST", &uri, Some(&member()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["id"], sub["id"]);
    assert_eq!(closed["ownership_status"], "unsubscribed");
    assert!(closed["expiry_date"].is_string());

    let (status, body) = app.send("POST", &uri, Some(&member()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Subscription not found");

    // Resubscribing after cancelling is allowed.
    let (status, _) = subscribe(&app, &member(), &agent["id"]).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn cannot_unsubscribe_for_another_user() {
    let app = TestApp::new();
    let agent = app.create_agent("Writer").await;
    let (_, sub) = subscribe(&app, &member(), &agent["id"]).await;
    let uri = format!(
        "/api/v1/subscriptions/unsubscribe/{}",
        sub["id"].as_str().unwrap()
    );

    let (status, body) = app.send("POST", &uri, Some(&other()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["detail"],
        "Not authorized to unsubscribe for another user"
    );
}

#[tokio::test]
async fn unsubscribe_unknown_id_is_not_found() {
    let app = TestApp::new();
    let (status, _) = app
        .send(
            "POST",
            "/api/v1/subscriptions/unsubscribe/00000000-0000-0000-0000-000000000000",
            Some(&member()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_agent_drops_its_subscriptions() {
    let app = TestApp::new();
    let agent = app.create_agent("Writer").await;
    subscribe(&app, &member(), &agent["id"]).await;

    let uri = format!("/api/v1/agents/{}", agent["id"].as_str().unwrap());
    let (status, _) = app.send("DELETE", &uri, Some(&admin()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = app
        .send(
            "GET",
            "/api/v1/subscriptions/user-subscriptions",
            Some(&member()),
            None,
        )
        .await;
    assert_eq!(list, json!([]));
}
