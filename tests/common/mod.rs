//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::util::ServiceExt;

use loan_tracker::api::{self, AppState};
use loan_tracker::auth::{hash_password, TokenService};
use loan_tracker::messages::Messages;
use loan_tracker::store::MemoryStore;

pub const ADMIN_LOGIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "s3cret-pass";
pub const JWT_SECRET: &[u8] = b"integration-test-secret-with-enough-bytes";
pub const MAX_IMAGE_BYTES: usize = 64 * 1024;

/// Router over a fresh in-memory store with one admin credential
pub fn setup_app() -> Router {
    let store = MemoryStore::new();
    store
        .add_user(
            ADMIN_LOGIN,
            &hash_password(ADMIN_PASSWORD).expect("Failed to hash admin password"),
        )
        .expect("Failed to seed admin user");

    let state = AppState::new(
        store,
        Arc::new(TokenService::new(JWT_SECRET)),
        Messages::bundled("pt-BR"),
        MAX_IMAGE_BYTES,
    );
    api::build_router(state)
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not JSON")
    }
}

/// Send a request and return the status with the decoded JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, read_json(response).await)
}

/// Log in as the seeded admin and return the bearer token
pub async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/login",
        None,
        Some(serde_json::json!({ "login": ADMIN_LOGIN, "password": ADMIN_PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "Login failed: {body}");
    body["token"].as_str().expect("token missing").to_string()
}

/// Decimal fields travel as strings; compare them by value
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal is not a string")
        .parse()
        .expect("decimal does not parse")
}

pub async fn create_beneficiary(app: &Router, token: &str, name: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/beneficiario",
        Some(token),
        Some(serde_json::json!({ "name": name, "phone": "11987654321" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Beneficiary creation failed: {body}");
    body["id"].as_i64().unwrap()
}

pub async fn create_loan(
    app: &Router,
    token: &str,
    beneficiary_id: i64,
    due_date: &str,
    principal: &str,
) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/api/emprestimo",
        Some(token),
        Some(serde_json::json!({
            "beneficiary_id": beneficiary_id,
            "loan_date": "2024-01-10",
            "due_date": due_date,
            "principal": principal,
            "percentage": "30",
            "settled": false,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Loan creation failed: {body}");
    body["id"].as_i64().unwrap()
}
