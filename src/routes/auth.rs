// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.
//!
//! Handlers only talk to the request's credential store; the session
//! middleware turns the resulting auth changes into cookies.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AuthError, Result};
use crate::middleware::auth::{
    clear_code_verifier_cookie, code_verifier_cookie, CALLBACK_PATH, CODE_VERIFIER_COOKIE,
};
use crate::middleware::RequestAuth;
use crate::routes::forms::{first_message, SignInForm, SignUpForm};
use crate::services::pkce;
use crate::services::route_guard::PROTECTED_LANDING_PATH;
use crate::views::{self, AuthMode, AuthPage};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-out", post(sign_out))
        .route(CALLBACK_PATH, get(auth_callback))
}

const CALLBACK_ERROR_REDIRECT: &str = "/auth?error=callback_error";
const CHECK_EMAIL_REDIRECT: &str = "/auth?notice=check_email";

fn auth_form_error(status: StatusCode, mode: AuthMode, email: &str, message: &str) -> Response {
    let page = views::auth_page(AuthPage {
        mode,
        email,
        error: Some(message),
        notice: None,
    });
    (status, page).into_response()
}

/// Sign in and go to the dashboard.
async fn sign_in(
    Extension(auth): Extension<RequestAuth>,
    Form(form): Form<SignInForm>,
) -> Result<Response> {
    if let Err(errors) = form.validate() {
        return Ok(auth_form_error(
            StatusCode::BAD_REQUEST,
            AuthMode::SignIn,
            &form.email,
            &first_message(&errors),
        ));
    }

    match auth.store.sign_in(form.email.trim(), &form.password).await {
        Ok(_) => Ok(Redirect::to(PROTECTED_LANDING_PATH).into_response()),
        Err(AuthError::InvalidCredentials) => Ok(auth_form_error(
            StatusCode::UNAUTHORIZED,
            AuthMode::SignIn,
            &form.email,
            "Invalid email or password",
        )),
        Err(e) => Err(e.into()),
    }
}

/// Register a new account.
///
/// The confirmation link comes back through the callback route carrying a
/// PKCE code, so the verifier is parked in a cookie scoped to that route.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RequestAuth>,
    Form(form): Form<SignUpForm>,
) -> Result<Response> {
    if let Err(errors) = form.validate() {
        return Ok(auth_form_error(
            StatusCode::BAD_REQUEST,
            AuthMode::SignUp,
            &form.email,
            &first_message(&errors),
        ));
    }

    let verifier = pkce::generate_verifier()?;
    let challenge = pkce::challenge_for(&verifier);
    let redirect_to = format!(
        "{}{}?next={}",
        state.config.site_url,
        CALLBACK_PATH,
        urlencoding::encode(PROTECTED_LANDING_PATH)
    );

    let pending = match auth
        .store
        .sign_up(form.email.trim(), &form.password, &redirect_to, Some(&challenge))
        .await
    {
        Ok(pending) => pending,
        Err(AuthError::Rejected(reason)) => {
            tracing::info!(reason = %reason, "Sign-up rejected");
            return Ok(auth_form_error(
                StatusCode::BAD_REQUEST,
                AuthMode::SignUp,
                &form.email,
                "Unable to create an account with those details",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if !pending.requires_confirmation() {
        return Ok(Redirect::to(PROTECTED_LANDING_PATH).into_response());
    }

    let jar = CookieJar::new().add(code_verifier_cookie(
        verifier,
        state.config.secure_cookies(),
    ));
    Ok((jar, Redirect::to(CHECK_EMAIL_REDIRECT)).into_response())
}

/// Sign out and return to the auth page.
async fn sign_out(Extension(auth): Extension<RequestAuth>) -> Redirect {
    // Cookies are cleared whether or not the backend revocation worked.
    if let Err(e) = auth.store.sign_out().await {
        tracing::warn!(error = %e, "Backend sign-out failed");
    }
    Redirect::to("/auth")
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    next: Option<String>,
}

/// Email link callback: exchange the code, then continue to `next`.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RequestAuth>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> (CookieJar, Redirect) {
    let next = safe_next(params.next.as_deref());
    let outgoing = CookieJar::new();

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return (outgoing, Redirect::to(&next));
    };

    let verifier = jar.get(CODE_VERIFIER_COOKIE).map(|c| c.value().to_string());
    let outgoing = match verifier {
        Some(_) => outgoing.add(clear_code_verifier_cookie(state.config.secure_cookies())),
        None => outgoing,
    };

    match auth
        .store
        .exchange_code_for_session(&code, verifier.as_deref())
        .await
    {
        Ok(_) => (outgoing, Redirect::to(&next)),
        Err(e) => {
            let e = AppError::from(e);
            tracing::warn!(error = %e, "Auth callback failed");
            (outgoing, Redirect::to(CALLBACK_ERROR_REDIRECT))
        }
    }
}

/// Only same-site absolute paths are valid continuations.
///
/// Browsers drop tab and newline characters while parsing a `Location`, so
/// `/\t/host` would become `//host`. Anything but printable ASCII
/// disqualifies the path, which also keeps it a valid header value.
fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if is_same_site_path(path) => path.to_string(),
        Some(other) => {
            tracing::warn!(next = %other, "Ignoring off-site callback redirect");
            PROTECTED_LANDING_PATH.to_string()
        }
        None => PROTECTED_LANDING_PATH.to_string(),
    }
}

fn is_same_site_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && path.chars().all(|c| c.is_ascii_graphic())
}
