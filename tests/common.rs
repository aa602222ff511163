#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use gymtron::config::{Config, ConfigV1};
use gymtron::routes::create_router;
use gymtron::state::AppState;
use gymtron::store::{MemoryStore, Store};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";

const TEST_CONFIG: &str = r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "console"
store:
  enabled: false
jwt:
  iss: gymtron-test
  exp: 3600
  secret: test-secret
password:
  memory_kib: 1024
  iterations: 1
  parallelism: 1
bind_address: 127.0.0.1:8081
"#;

pub fn load_test_config() -> ConfigV1 {
    let config: Config = Figment::new()
        .merge(Yaml::string(TEST_CONFIG))
        .extract()
        .expect("Failed to parse test config YAML");

    match config {
        Config::ConfigV1(cfg) => cfg,
    }
}

pub fn build_app_with_store(store: Arc<dyn Store>) -> Router {
    let state =
        AppState::new(Arc::new(load_test_config()), store).expect("test state should build");
    create_router(state)
}

pub fn build_app() -> Router {
    build_app_with_store(Arc::new(MemoryStore::new()))
}

pub fn json_request(method: Method, path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn empty_request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn request_with_authorization(path: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(header::AUTHORIZATION, authorization)
        .body(Body::empty())
        .expect("failed to build request")
}

/// Sends one request through a clone of the router and returns status + parsed body.
/// Non-JSON bodies come back as a JSON string.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response<Body> = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should complete");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

/// Registers a user and returns its id.
pub async fn register(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/users",
            &serde_json::json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);
    body["_id"].as_str().expect("user id").to_string()
}

/// Authenticates and returns the bearer token.
pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            "/auth",
            &serde_json::json!({ "username": username, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().expect("token").to_string()
}
