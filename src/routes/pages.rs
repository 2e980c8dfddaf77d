// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public pages: landing and auth entry.

use crate::middleware::RequestAuth;
use crate::views::{self, AuthMode, AuthPage, CALLBACK_ERROR_MESSAGE, CHECK_EMAIL_MESSAGE};
use crate::AppState;
use axum::{
    extract::Query,
    response::Html,
    routing::get,
    Extension, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(landing))
        .route("/auth", get(auth_page))
}

async fn landing(Extension(auth): Extension<RequestAuth>) -> Html<String> {
    views::landing(auth.session.is_some())
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthPageParams {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    notice: Option<String>,
    #[serde(default)]
    mode: Option<String>,
}

/// Sign-in / sign-up page. Only reached by anonymous visitors.
async fn auth_page(Query(params): Query<AuthPageParams>) -> Html<String> {
    let error = match params.error.as_deref() {
        Some("callback_error") => Some(CALLBACK_ERROR_MESSAGE),
        Some(_) => Some("An error occurred"),
        None => None,
    };
    let notice = match params.notice.as_deref() {
        Some("check_email") => Some(CHECK_EMAIL_MESSAGE),
        _ => None,
    };
    let mode = match params.mode.as_deref() {
        Some("sign-up") => AuthMode::SignUp,
        _ => AuthMode::SignIn,
    };

    views::auth_page(AuthPage {
        mode,
        email: "",
        error,
        notice,
    })
}
