// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
};
use fitforge::backend::{IdentityBackend, MemoryBackend};
use fitforge::config::Config;
use fitforge::models::Session;
use fitforge::routes::create_router;
use fitforge::AppState;
use std::sync::Arc;

pub const PASSWORD: &str = "hunter22";

/// Create a test app backed by the in-memory backend.
/// Returns the router, the shared state and a handle on the backend.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryBackend) {
    create_test_app_with_site_url("http://localhost:3000")
}

#[allow(dead_code)]
pub fn create_test_app_with_site_url(
    site_url: &str,
) -> (axum::Router, Arc<AppState>, MemoryBackend) {
    let mut config = Config::test_default();
    config.site_url = site_url.to_string();

    let backend = MemoryBackend::new();
    let state = Arc::new(AppState {
        config,
        identity: Arc::new(backend.clone()),
        data: Arc::new(backend.clone()),
    });

    (create_router(state.clone()), state, backend)
}

/// Register a user and sign them in directly against the backend.
#[allow(dead_code)]
pub async fn signed_in_user(backend: &MemoryBackend, email: &str) -> Session {
    backend.register_user(email, PASSWORD);
    backend
        .sign_in_with_password(email, PASSWORD)
        .await
        .expect("sign-in should succeed")
}

/// `Cookie` header value carrying a session's token pair.
#[allow(dead_code)]
pub fn session_cookies(session: &Session) -> String {
    format!(
        "sb-access-token={}; sb-refresh-token={}",
        session.access_token,
        session.refresh_token.as_deref().unwrap_or_default()
    )
}

#[allow(dead_code)]
pub fn get(uri: &str, cookies: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_form(uri: &str, cookies: Option<&str>, form: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The Set-Cookie header for `name`, if one was sent.
#[allow(dead_code)]
pub fn find_cookie(headers: &[String], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
}

/// Value of a Set-Cookie header (`name=value; ...`).
#[allow(dead_code)]
pub fn cookie_value(set_cookie: &str) -> &str {
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, value)| value)
        .unwrap_or_default()
}

#[allow(dead_code)]
pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}
