#![allow(dead_code)] // each test binary uses a different subset of helpers

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use mockable::Clock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use taskretro_server::config::Config;
use taskretro_server::retrospective::InMemoryRetrospectiveRepository;
use taskretro_server::task::InMemoryTaskRepository;
use taskretro_server::web::{AppState, create_app};
use tower::ServiceExt;

/// Clock frozen at noon local time on a given day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Local>);

impl FixedClock {
    pub fn on(date: NaiveDate) -> Self {
        let noon = date.and_hms_opt(12, 0, 0).unwrap();
        Self(Local.from_local_datetime(&noon).earliest().unwrap())
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }
}

/// Builds the full application on fresh in-memory repositories.
pub fn setup_app() -> Router {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    create_app(AppState::in_memory(Config::default()))
}

/// Like [`setup_app`], with "today" pinned to `date`.
pub fn setup_app_on(date: NaiveDate) -> Router {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    create_app(AppState::new(
        Config::default(),
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(InMemoryRetrospectiveRepository::new()),
        Arc::new(FixedClock::on(date)),
    ))
}

/// Sends a request through the router and decodes the JSON body (`Null` when empty).
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Sends a raw body, for payloads that are not valid JSON.
pub async fn send_raw(app: &Router, method: Method, uri: &str, body: &'static str) -> StatusCode {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

/// Creates a task through the API and returns its JSON projection.
pub async fn create_task(app: &Router, payload: Value) -> Value {
    let (status, body) = send(app, Method::POST, "/tasks", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body
}

/// Creates a retrospective through the API and returns its JSON projection.
pub async fn create_retrospective(app: &Router, payload: Value) -> Value {
    let (status, body) = send(app, Method::POST, "/retrospectives", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {body}");
    body
}

/// HTTP response snapshot for testing endpoints with deterministic output.
#[derive(Debug, Serialize)]
pub struct HttpResponseSnapshot {
    test_context: String,
    status: u16,
    content_type: Option<String>,
    body: Value,
}

impl HttpResponseSnapshot {
    pub async fn capture(app: &Router, method: Method, uri: &str, test_context: &str) -> Self {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        Self {
            test_context: test_context.to_string(),
            status: status.as_u16(),
            content_type,
            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        }
    }
}
