//! Integration tests for the chat relay and session endpoints, driving the
//! router directly with a mocked AI upstream.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use tower_cookies::CookieManagerLayer;

use sprintplanner::api_router::configure_api_routes;
use sprintplanner::config::{AppConfig, ServerConfig};
use sprintplanner::shared::state::AppState;

fn test_config(ai_server_url: String) -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database_url: "postgres://unused:@localhost:5432/unused".to_string(),
        ai_server_url,
        relay_timeout: Duration::from_secs(5),
        secure_cookies: false,
    }
}

/// Router with a pool that never connects; these tests exercise paths that
/// stay off the database.
fn test_app(ai_server_url: String) -> axum::Router {
    let manager = ConnectionManager::<PgConnection>::new("postgres://unused:@localhost:5432/unused");
    let pool = Pool::builder().build_unchecked(manager);
    let state = Arc::new(AppState::new(test_config(ai_server_url), pool));
    configure_api_routes()
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

fn chat_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"message":"hello"}"#))
        .unwrap()
}

#[tokio::test]
async fn relay_collapses_upstream_failure_to_backend_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/stream")
        .with_status(503)
        .with_body("service unavailable")
        .create_async()
        .await;

    let app = test_app(server.url());
    let response = app.oneshot(chat_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Backend error");
    mock.assert_async().await;
}

#[tokio::test]
async fn relay_reports_backend_error_when_upstream_unreachable() {
    // Nothing is listening on the target port.
    let app = test_app("http://127.0.0.1:1".to_string());
    let response = app.oneshot(chat_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Backend error");
}

#[tokio::test]
async fn relay_pipes_upstream_bytes_unmodified() {
    let upstream_body = "{\"content\":\"He\"}\n{\"content\":\"llo\"}\nnot-json\n";
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/stream")
        .match_body(mockito::Matcher::JsonString(
            r#"{"message":"hello"}"#.to_string(),
        ))
        .with_status(200)
        .with_body(upstream_body)
        .create_async()
        .await;

    let app = test_app(server.url());
    let response = app.oneshot(chat_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
    assert_eq!(
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], upstream_body.as_bytes());
    mock.assert_async().await;
}

#[tokio::test]
async fn session_clear_reissues_distinct_ids() {
    let app = test_app("http://127.0.0.1:1".to_string());

    let mut ids = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/session/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(|s| s.to_string()))
            .collect();

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["success"], serde_json::json!(true));

        let session_id = parsed["sessionId"].as_str().unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&session_id).is_ok());
        // The cookie carries the newly issued id.
        assert!(set_cookies
            .iter()
            .any(|c| c.contains(&format!("sprint-planner-session-id={}", session_id))));
        ids.push(session_id);
    }

    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn board_mock_serves_fixture() {
    let app = test_app("http://127.0.0.1:1".to_string());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/test-data/board")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["entries"].as_array().unwrap().len(), 2);
    assert_eq!(parsed["dependencies"].as_array().unwrap().len(), 1);
}
