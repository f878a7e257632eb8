//! Mock platform services
//!
//! A single router answers for every service: the harness addresses each
//! service by base URL and path, and the paths do not collide.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

pub const BROKER_API_KEY: &str = "test-broker-key";

const TOKEN_PREFIX: &str = "token-";

/// Accounts, deletions and mailbox clears seen by the mock services
#[derive(Default)]
pub struct MockPlatform {
    pub requires_verification: bool,
    accounts: Mutex<HashMap<String, (String, String)>>,
    deleted: Mutex<Vec<String>>,
    mailbox_clears: AtomicUsize,
}

impl MockPlatform {
    pub fn new(requires_verification: bool) -> Arc<Self> {
        Arc::new(Self {
            requires_verification,
            ..Self::default()
        })
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn registered(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn mailbox_clears(&self) -> usize {
        self.mailbox_clears.load(Ordering::SeqCst)
    }
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// `/health` answering with `status` and the given marker
pub fn health_router(status: StatusCode, marker: &'static str) -> Router {
    Router::new().route(
        "/health",
        get(move || async move { (status, Json(json!({ "status": marker }))) }),
    )
}

/// Health, auth, users, the broker, Mailpit and a few echo endpoints for client tests
pub fn platform_router(platform: Arc<MockPlatform>) -> Router {
    Router::new()
        .route("/health", get(healthy))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify", get(verify))
        .route("/api/users/:id", get(find_user).delete(delete_user))
        .route("/api/v1/publish", post(publish))
        .route("/api/v1/messages", delete(clear_mailbox))
        .route("/echo", get(echo))
        .route("/slow", get(slow))
        .route("/status/:code", get(status_code))
        .with_state(platform)
}

async fn healthy() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "message-broker-service",
        "broker": { "connected": true, "type": "rabbitmq" },
    }))
}

async fn register(State(platform): State<Arc<MockPlatform>>, Json(body): Json<Value>) -> Response {
    let field = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
    let (email, password) = (field("email"), field("password"));
    if !email.contains('@') || password.len() < 8 || field("firstName").is_empty() {
        return error(StatusCode::BAD_REQUEST, "Validation failed");
    }

    let mut accounts = platform.accounts.lock().unwrap();
    if accounts.contains_key(&email) {
        return error(StatusCode::CONFLICT, "User already exists");
    }
    let user_id = format!("{:024x}", accounts.len() + 1);
    accounts.insert(email.clone(), (user_id.clone(), password));

    let body = json!({
        "message": "Registration successful",
        "user": { "_id": user_id, "email": email, "isActive": true },
        "requiresVerification": platform.requires_verification,
    });
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn login(State(platform): State<Arc<MockPlatform>>, Json(body): Json<Value>) -> Response {
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    match platform.accounts.lock().unwrap().get(email) {
        Some((user_id, stored)) if stored == password => {
            Json(json!({ "token": format!("{TOKEN_PREFIX}{user_id}"), "user": { "_id": user_id } })).into_response()
        }
        _ => error(StatusCode::UNAUTHORIZED, "Invalid credentials"),
    }
}

async fn verify(headers: HeaderMap) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        Some(token) if token.starts_with(TOKEN_PREFIX) => Json(json!({ "valid": true })).into_response(),
        _ => error(StatusCode::UNAUTHORIZED, "Invalid token"),
    }
}

async fn find_user(Path(_id): Path<String>) -> Response {
    error(StatusCode::NOT_FOUND, "User not found")
}

async fn delete_user(State(platform): State<Arc<MockPlatform>>, Path(id): Path<String>) -> Json<Value> {
    platform.deleted.lock().unwrap().push(id);
    Json(json!({ "message": "User deleted" }))
}

async fn clear_mailbox(State(platform): State<Arc<MockPlatform>>) -> StatusCode {
    platform.mailbox_clears.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn publish(headers: HeaderMap, body: Bytes) -> Response {
    match headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        None => return error(StatusCode::UNAUTHORIZED, "API key required"),
        Some(key) if key != BROKER_API_KEY => return error(StatusCode::UNAUTHORIZED, "Invalid API key"),
        Some(_) => {}
    }

    let Ok(event) = serde_json::from_slice::<Value>(&body) else {
        return error(StatusCode::BAD_REQUEST, "Invalid JSON");
    };
    for field in ["source", "eventType", "data"] {
        match event.get(field) {
            None | Some(Value::Null) => {
                return error(StatusCode::BAD_REQUEST, format!("Missing required field: {field}"));
            }
            Some(Value::String(value)) if value.is_empty() => {
                return error(StatusCode::BAD_REQUEST, format!("Field {field} must not be empty"));
            }
            Some(_) => {}
        }
    }

    let body = json!({
        "success": true,
        "messageId": uuid::Uuid::new_v4().to_string(),
        "eventType": event["eventType"],
    });
    let mut response = Json(body).into_response();
    if let Some(correlation_id) = headers.get("x-correlation-id") {
        response.headers_mut().insert("x-correlation-id", correlation_id.clone());
    }
    response
}

async fn echo(headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Json(json!({
        "authorization": header("authorization"),
        "correlationId": header("x-correlation-id"),
        "correlationHeaders": headers.get_all("x-correlation-id").iter().count(),
        "apiKey": header("x-api-key"),
        "query": query,
    }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({ "status": "late" }))
}

async fn status_code(Path(code): Path<u16>) -> Response {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error(status, "boom")
}
