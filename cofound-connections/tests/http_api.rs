mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Fixture;
use cofound_connections::models::Profile;

async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn request_connection(fx: &Fixture, from: &Profile, to: &Profile) -> (StatusCode, Value) {
    send(
        fx.router(),
        Method::POST,
        "/connections",
        Some(&fx.token_for(from)),
        Some(json!({ "receiver_id": to.id })),
    )
    .await
}

#[tokio::test]
async fn health_reports_store_and_emitter() {
    let fx = Fixture::new();
    let (status, body) = send(fx.router(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn health_fails_when_store_is_down() {
    let fx = Fixture::new();
    fx.store.fail_next(1);
    let (status, body) = send(fx.router(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn metrics_without_recorder_is_not_found() {
    let fx = Fixture::new();
    let (status, _) = send(fx.router(), Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn connection_routes_require_a_token() {
    let fx = Fixture::new();
    let (status, body) = send(fx.router(), Method::GET, "/connections", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "E0004");
}

#[tokio::test]
async fn caller_without_profile_gets_profile_not_found() {
    let fx = Fixture::new();
    let ghost = fx.add_profile(true);
    let other = fx.add_profile(true);
    let token = fx.token_for(&ghost);
    let fx2 = Fixture::new();
    fx2.directory.upsert(other.clone());

    // ghost's credential is unknown to the second service instance
    let app = fx2.router();
    let (status, body) = send(
        app,
        Method::POST,
        "/connections",
        Some(&token),
        Some(json!({ "receiver_id": other.id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "E2001");
}

#[tokio::test]
async fn create_then_duplicate_is_conflict_with_details() {
    let fx = Fixture::new();
    let (a, b) = (fx.add_profile(true), fx.add_profile(true));

    let (status, body) = request_connection(&fx, &a, &b).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");

    let (status, body) = request_connection(&fx, &b, &a).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "E8005");
    assert_eq!(body["error"]["message"], "You've already connected with this person");
    assert_eq!(body["error"]["details"]["kind"], "conflict");
    assert_eq!(body["error"]["details"]["retryable"], false);
}

#[tokio::test]
async fn self_request_is_forbidden() {
    let fx = Fixture::new();
    let a = fx.add_profile(true);
    let (status, body) = request_connection(&fx, &a, &a).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "E8001");
    assert_eq!(body["error"]["details"]["kind"], "validation");
}

#[tokio::test]
async fn only_receiver_can_accept_over_http() {
    let fx = Fixture::new();
    let (a, b) = (fx.add_profile(true), fx.add_profile(true));
    let (_, created) = request_connection(&fx, &a, &b).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/connections/{id}/accept");
    let (status, body) = send(fx.router(), Method::PUT, &uri, Some(&fx.token_for(&a)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "E8002");

    let (status, body) = send(fx.router(), Method::PUT, &uri, Some(&fx.token_for(&b)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "accepted");

    let (status, body) = send(fx.router(), Method::PUT, &uri, Some(&fx.token_for(&b)), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "E8006");
}

#[tokio::test]
async fn withdraw_twice_is_an_idempotent_delete() {
    let fx = Fixture::new();
    let (a, b) = (fx.add_profile(true), fx.add_profile(true));
    let (_, created) = request_connection(&fx, &a, &b).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/connections/{id}/withdraw");

    let (status, body) = send(fx.router(), Method::DELETE, &uri, Some(&fx.token_for(&a)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], true);

    let (status, body) = send(fx.router(), Method::DELETE, &uri, Some(&fx.token_for(&a)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], false);
}

#[tokio::test]
async fn remove_pending_is_conflict() {
    let fx = Fixture::new();
    let (a, b) = (fx.add_profile(true), fx.add_profile(true));
    let (_, created) = request_connection(&fx, &a, &b).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let uri = format!("/connections/{id}");
    let (status, body) = send(fx.router(), Method::DELETE, &uri, Some(&fx.token_for(&b)), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "E8008");
}

#[tokio::test]
async fn overview_and_status_are_caller_relative() {
    let fx = Fixture::new();
    let (a, b) = (fx.add_profile(true), fx.add_profile(true));
    request_connection(&fx, &a, &b).await;

    let (status, body) = send(fx.router(), Method::GET, "/connections", Some(&fx.token_for(&b)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pending_received"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["pending_sent"].as_array().map(Vec::len), Some(0));

    let uri = format!("/connections/status/{}", b.id);
    let (_, body) = send(fx.router(), Method::GET, &uri, Some(&fx.token_for(&a)), None).await;
    assert_eq!(body["data"]["state"], "pending_sent");
}

#[tokio::test]
async fn discovery_validates_limit_and_excludes_requested() {
    let fx = Fixture::new();
    let viewer = fx.add_profile(true);
    let requested = fx.add_profile(true);
    let fresh = fx.add_profile(true);
    fx.add_profile(false);
    request_connection(&fx, &viewer, &requested).await;

    let token = fx.token_for(&viewer);
    let (status, body) = send(fx.router(), Method::GET, "/discovery?limit=0", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E0002");

    let (status, body) = send(fx.router(), Method::GET, "/discovery", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert_eq!(ids, vec![fresh.id.to_string().as_str()]);
    assert!(body["data"]["next_cursor"].is_null());
}

#[tokio::test]
async fn internal_routes_answer_without_auth() {
    let fx = Fixture::new();
    let (a, b) = (fx.add_profile(true), fx.add_profile(true));
    let conn = fx.lifecycle().create_request(a.id, b.id).await.unwrap();

    let uri = format!("/internal/connected/{}/{}", a.id, b.id);
    let (_, body) = send(fx.router(), Method::GET, &uri, None, None).await;
    assert_eq!(body["data"]["connected"], false);

    fx.lifecycle().accept(conn.id, b.id).await.unwrap();
    let (_, body) = send(fx.router(), Method::GET, &uri, None, None).await;
    assert_eq!(body["data"]["connected"], true);

    let uri = format!("/internal/connected-ids/{}", b.id);
    let (status, body) = send(fx.router(), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["connected_ids"], json!([a.id]));
}
