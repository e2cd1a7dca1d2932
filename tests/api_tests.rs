/// HTTP surface exercised through the router without a socket
mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use common::test_app;
use kindred::{auth::USER_ID_HEADER, server::build_router};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_ID_HEADER, user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, value)
}

async fn signed_up(app: &Router) -> String {
    let (status, user) = send(
        app,
        "POST",
        "/api/users",
        None,
        Some(json!({ "email": "ana@example.com", "name": "Ana" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    user["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_database_status() {
    let app = build_router(test_app().await.ctx);
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() {
    let app = build_router(test_app().await.ctx);
    let (status, body) = send(&app, "GET", "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn requests_without_a_known_user_are_rejected() {
    let app = build_router(test_app().await.ctx);

    let (status, body) = send(&app, "GET", "/api/people", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "AuthenticationRequired");

    let (status, _) = send(&app, "GET", "/api/people", Some("ghost"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn people_flow_flags_then_merges_duplicates() {
    let app = build_router(test_app().await.ctx);
    let user = signed_up(&app).await;

    let (status, first) = send(
        &app,
        "POST",
        "/api/people",
        Some(&user),
        Some(json!({
            "name": "Jo",
            "identities": [{ "source": "PHONE", "value": "555-010-0077" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(first["possible_duplicate"].is_null());
    let first_id = first["person"]["id"].as_str().unwrap().to_string();

    let (status, second) = send(
        &app,
        "POST",
        "/api/people",
        Some(&user),
        Some(json!({
            "name": "Joanna",
            "identities": [{ "source": "PHONE", "value": "+1 555 010 0077" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["possible_duplicate"]["id"], first_id.as_str());
    let second_id = second["person"]["id"].as_str().unwrap().to_string();

    let (_, dupes) = send(&app, "GET", "/api/duplicates", Some(&user), None).await;
    let suggestions = dupes["suggestions"].as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["match_type"], "phone");
    assert_eq!(suggestions[0]["match_value"], "+15550100077");

    let (status, merged) = send(
        &app,
        "POST",
        "/api/merge",
        Some(&user),
        Some(json!({ "survivor_id": first_id, "donor_id": second_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(merged["identities"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, "GET", &format!("/api/people/{}", second_id), Some(&user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, dupes) = send(&app, "GET", "/api/duplicates", Some(&user), None).await;
    assert!(dupes["suggestions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_input_is_a_bad_request() {
    let app = build_router(test_app().await.ctx);
    let user = signed_up(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/people",
        Some(&user),
        Some(json!({
            "name": "Kim",
            "identities": [{ "source": "EMAIL", "value": "not-an-email" }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidRequest");

    let (_, people) = send(&app, "GET", "/api/people", Some(&user), None).await;
    assert!(people["people"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invite_links_accept_rsvps_without_an_account() {
    let app = build_router(test_app().await.ctx);
    let user = signed_up(&app).await;

    let starts_at = (chrono::Utc::now() + chrono::Duration::days(14)).to_rfc3339();
    let (status, event) = send(
        &app,
        "POST",
        "/api/events",
        Some(&user),
        Some(json!({ "title": "Birthday dinner", "starts_at": starts_at })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_str().unwrap().to_string();
    let token = event["invite_token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 43);

    let (status, invite) = send(&app, "GET", &format!("/api/invites/{}", token), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invite["title"], "Birthday dinner");
    assert_eq!(invite["host_name"], "Ana");

    let (status, guest) = send(
        &app,
        "POST",
        &format!("/api/invites/{}/rsvp", token),
        None,
        Some(json!({ "status": "ACCEPTED", "name": "Rae", "email": "rae@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(guest["status"], "ACCEPTED");

    let (_, guests) = send(
        &app,
        "GET",
        &format!("/api/events/{}/guests", event_id),
        Some(&user),
        None,
    )
    .await;
    assert_eq!(guests["guests"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", "/api/invites/not-a-token", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upcoming_lists_celebrations_in_the_window() {
    let app = build_router(test_app().await.ctx);
    let user = signed_up(&app).await;

    let (_, created) = send(
        &app,
        "POST",
        "/api/people",
        Some(&user),
        Some(json!({ "name": "Nia" })),
    )
    .await;
    let person_id = created["person"]["id"].as_str().unwrap().to_string();

    let (status, celebration) = send(
        &app,
        "POST",
        &format!("/api/people/{}/celebrations", person_id),
        Some(&user),
        Some(json!({ "kind": "BIRTHDAY", "date": "1994-03-15", "reminder_offsets": [2, 0] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(celebration["recurrence"], "YEARLY");

    let (status, body) = send(
        &app,
        "GET",
        "/api/upcoming?from=2026-03-01&days=30",
        Some(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let upcoming = body["upcoming"].as_array().unwrap();
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0]["next_occurrence"], "2026-03-15");
    assert_eq!(upcoming[0]["days_until"], 14);
    assert_eq!(upcoming[0]["person_name"], "Nia");

    let (_, body) = send(
        &app,
        "GET",
        "/api/upcoming?from=2026-03-16&days=30",
        Some(&user),
        None,
    )
    .await;
    assert!(body["upcoming"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn metrics_are_exposed_in_prometheus_format() {
    let app = build_router(test_app().await.ctx);
    send(&app, "GET", "/health", None, None).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("kindred_http_requests_total"));
}
