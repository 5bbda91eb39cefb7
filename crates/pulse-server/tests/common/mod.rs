#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use pulse_common::Signer;
use pulse_server::app;
use pulse_server::state::AppState;
use pulse_storage::{MemoryRepository, SnapshotFile};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const TEST_KEY: &str = "test-secret";

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

fn context(signer: Signer, sync_snapshot: bool) -> TestContext {
    let temp_dir = tempfile::tempdir().expect("temp dir should be created");
    let repository = Arc::new(MemoryRepository::new(signer.clone()));
    let mut state = AppState::new(repository, signer);
    if sync_snapshot {
        let file = SnapshotFile::new(temp_dir.path().join("metrics.json"));
        state = state.with_sync_snapshot(Arc::new(file));
    }
    let app = app::build_http_app(state.clone());
    TestContext {
        temp_dir,
        state,
        app,
    }
}

pub fn build_test_context() -> TestContext {
    context(Signer::disabled(), false)
}

pub fn build_signed_context() -> TestContext {
    context(Signer::new(TEST_KEY), false)
}

pub fn build_sync_snapshot_context() -> TestContext {
    context(Signer::disabled(), true)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.headers.get("x-trace-id").and_then(|h| h.to_str().ok())
    }
}

pub async fn send(app: &axum::Router, req: Request<Body>) -> TestResponse {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read")
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn request_json(app: &axum::Router, method: &str, uri: &str, body: Value) -> TestResponse {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_raw(app: &axum::Router, method: &str, uri: &str, body: &str) -> TestResponse {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(app: &axum::Router, method: &str, uri: &str) -> TestResponse {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");
    send(app, req).await
}

pub async fn read_value(app: &axum::Router, kind: &str, id: &str) -> TestResponse {
    request_no_body(app, "GET", &format!("/value/{kind}/{id}")).await
}
