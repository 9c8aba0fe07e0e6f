// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-FlowGen-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of FlowGen and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rstest::{fixture, rstest};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::{router, AppState};
use crate::llm::ScriptedModel;
use crate::model::fixtures::RENAME_SCENARIO;
use crate::orchestrator::OrchestratorConfig;

const RENAME_REPLY: &str = "Renamed.\n```xml\n<mxCell id=\"2\" value=\"Z\" vertex=\"1\" parent=\"1\"/>\n```";

#[fixture]
fn state() -> AppState {
    let model = ScriptedModel::new().reply(RENAME_REPLY);
    AppState::new(Arc::new(model), OrchestratorConfig::default(), "scripted")
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).expect("request")).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json body") };
    (status, value)
}

#[rstest]
#[tokio::test]
async fn welcome_and_health(state: AppState) {
    let app = router(state);
    let (status, body) = call(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["api"], "/api/v1");

    let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "model": "scripted", "diagrams": 0}));
}

#[rstest]
#[tokio::test]
async fn diagram_crud_round_trip(state: AppState) {
    let app = router(state);

    let (status, created) = call(&app, Method::POST, "/api/v1/diagrams", Some(json!({"type": "flowchart"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().expect("id").to_owned();
    assert!(created["content"].as_str().expect("content").starts_with("<mxfile>"));

    let uri = format!("/api/v1/diagrams/{id}");
    let (status, updated) =
        call(&app, Method::PUT, &uri, Some(json!({"content": RENAME_SCENARIO}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], RENAME_SCENARIO);
    assert_eq!(updated["type"], "flowchart");

    let (status, fetched) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, updated);

    let (status, deleted) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({"id": id, "deleted": true}));

    let (status, missing) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(missing["error"].as_str().expect("error").contains("not found"));
}

#[rstest]
#[tokio::test]
async fn outline_lists_nodes_and_connections(state: AppState) {
    let app = router(state);
    let (_, created) = call(
        &app,
        Method::POST,
        "/api/v1/diagrams",
        Some(json!({"type": "flowchart", "content": RENAME_SCENARIO})),
    )
    .await;
    let id = created["id"].as_str().expect("id");

    let (status, body) = call(&app, Method::GET, &format!("/api/v1/diagrams/{id}/outline"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vertices"], 2);
    assert_eq!(body["edges"], 1);
    assert!(body["outline"].as_str().expect("outline").contains("A -> B"));
}

#[rstest]
#[tokio::test]
async fn outline_of_a_malformed_document_is_unprocessable(state: AppState) {
    let app = router(state);
    let (_, created) =
        call(&app, Method::POST, "/api/v1/diagrams", Some(json!({"type": "x", "content": "<mxfile>"}))).await;
    let id = created["id"].as_str().expect("id");

    let (status, _) = call(&app, Method::GET, &format!("/api/v1/diagrams/{id}/outline"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[rstest]
#[tokio::test]
async fn successful_generation_is_stored(state: AppState) {
    let store = Arc::clone(state.store());
    let app = router(state);
    let request = json!({
        "type": "flowchart",
        "user_prompt": "rename A to Z",
        "current_drawio": RENAME_SCENARIO,
    });

    let (status, body) = call(&app, Method::POST, "/api/v1/generate-diagram", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["analysis"], "Renamed.");
    assert!(body["content"].as_str().expect("content").contains(r#"value="Z""#));
    assert_eq!(body["diagram"]["content"], body["content"]);
    assert_eq!(store.len().await, 1);
}

#[rstest]
#[tokio::test]
async fn failed_generation_is_not_stored() {
    let state = AppState::new(Arc::new(ScriptedModel::new()), OrchestratorConfig::default(), "empty");
    let store = Arc::clone(state.store());
    let app = router(state);
    let request = json!({"type": "flowchart", "user_prompt": "x", "current_drawio": "<mxfile>"});

    let (status, body) = call(&app, Method::POST, "/api/v1/generate-diagram", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["content"], "<mxfile>");
    assert!(body.get("diagram").is_none());
    assert!(store.is_empty().await);
}

async fn sse_events(app: &Router, uri: &str, body: Value) -> Vec<Value> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok()),
        Some("text/event-stream")
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf-8");
    text.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .map(|json| serde_json::from_str(json).expect("event json"))
        .collect()
}

fn event_types(events: &[Value]) -> Vec<&str> {
    events.iter().filter_map(|event| event["type"].as_str()).collect()
}

#[rstest]
#[tokio::test]
async fn streamed_generation_is_served_as_sse(state: AppState) {
    let app = router(state);
    let request = json!({"type": "flowchart", "user_prompt": "rename", "current_drawio": RENAME_SCENARIO});
    let events = sse_events(&app, "/api/v1/generate-diagram/stream", request).await;

    assert_eq!(event_types(&events), ["analysis", "diagram", "final"]);
    assert_eq!(events[2]["success"], true);
}

#[tokio::test]
async fn streamed_empty_change_set_is_not_stored() {
    let model = ScriptedModel::new().reply("Nothing to change.\n```xml\n```");
    let state = AppState::new(Arc::new(model), OrchestratorConfig::default(), "scripted");
    let store = Arc::clone(state.store());
    let app = router(state);
    let request = json!({"type": "flowchart", "user_prompt": "noop", "current_drawio": RENAME_SCENARIO});
    let events = sse_events(&app, "/api/v1/generate-diagram/stream", request).await;

    assert!(!event_types(&events).contains(&"diagram"));
    let last = events.last().expect("final event");
    assert_eq!(last["type"], "final");
    assert_eq!(last["success"], false);
    assert_eq!(last["content"], RENAME_SCENARIO);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn chat_returns_the_model_reply() {
    let model = ScriptedModel::new().reply("A swimlane groups steps by owner.");
    let app = router(AppState::new(Arc::new(model), OrchestratorConfig::default(), "scripted"));

    let (status, body) = call(&app, Method::POST, "/api/v1/chat", Some(json!({"message": "swimlane?"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "A swimlane groups steps by owner."}));
}

#[rstest]
#[case("/api/v1/chat")]
#[case("/api/v1/chat/stream")]
#[tokio::test]
async fn blank_chat_messages_are_rejected(state: AppState, #[case] uri: &str) {
    let app = router(state);
    let (status, body) = call(&app, Method::POST, uri, Some(json!({"message": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "message must not be empty");
}

#[tokio::test]
async fn chat_model_failures_are_bad_gateway() {
    let app = router(AppState::new(Arc::new(ScriptedModel::new()), OrchestratorConfig::default(), "empty"));
    let (status, body) = call(&app, Method::POST, "/api/v1/chat", Some(json!({"message": "hi"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "no more scripted replies");
}

#[tokio::test]
async fn streamed_chat_is_served_as_sse() {
    let model = ScriptedModel::new().reply("Hello there").chunk_chars(4);
    let app = router(AppState::new(Arc::new(model), OrchestratorConfig::default(), "scripted"));
    let events = sse_events(&app, "/api/v1/chat/stream", json!({"message": "hi"})).await;

    assert_eq!(event_types(&events), ["text", "text", "text", "final"]);
    let text: String = events.iter().filter_map(|event| event["text"].as_str()).collect();
    assert_eq!(text, "Hello there");
    assert_eq!(events[3]["content"], "Hello there");
}

#[rstest]
#[tokio::test]
async fn invalid_ids_are_rejected(state: AppState) {
    let app = router(state);
    let (status, _) = call(&app, Method::GET, "/api/v1/diagrams/%20padded", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
