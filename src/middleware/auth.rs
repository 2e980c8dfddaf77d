// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session middleware: per-request credential store, route guard and cookie sync.

use crate::models::{AuthChange, Session};
use crate::services::{
    decide, resolve_session, CredentialStore, GuardDecision, PathClass, PersistedTokens,
    ResolutionSource,
};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use time::Duration;

pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";
/// PKCE verifier; only sent back to the callback route.
pub const CODE_VERIFIER_COOKIE: &str = "sb-code-verifier";
pub const CALLBACK_PATH: &str = "/api/auth/callback";

/// Lifetime of the session cookies in the browser. The refresh token inside
/// decides how long they are actually useful.
const SESSION_COOKIE_MAX_AGE_DAYS: i64 = 30;
const CODE_VERIFIER_MAX_AGE_MINUTES: i64 = 60;

/// Auth context for handlers, inserted by [`guard_session`].
#[derive(Clone)]
pub struct RequestAuth {
    /// This request's credential store.
    pub store: Arc<CredentialStore>,
    /// Session resolved before the handler ran.
    pub session: Option<Session>,
}

/// Middleware that resolves the session and applies the route guard.
///
/// Runs on every request. Session changes made while the request is handled
/// (sign-in, refresh, sign-out) are written back to the cookies afterwards.
pub async fn guard_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let secure = state.config.secure_cookies();
    let store = Arc::new(CredentialStore::new(state.identity.clone()));
    let mut changes = store.subscribe();

    let persisted = persisted_tokens(&jar);
    let resolution = resolve_session(&store, persisted.as_ref()).await;

    let mut outgoing = CookieJar::new();
    if resolution.source == ResolutionSource::ExchangeFailed {
        tracing::debug!("Clearing stale session cookies");
        outgoing = clear_session_cookies(outgoing, secure);
    }

    let path = request.uri().path().to_string();
    if let GuardDecision::Redirect(target) =
        decide(PathClass::of(&path), resolution.is_authenticated())
    {
        tracing::debug!(path = %path, target, "Route guard redirect");
        let outgoing = apply_auth_changes(outgoing, changes.drain(), secure);
        return (outgoing, Redirect::to(target)).into_response();
    }

    request.extensions_mut().insert(RequestAuth {
        store: store.clone(),
        session: resolution.session,
    });

    let response = next.run(request).await;

    let outgoing = apply_auth_changes(outgoing, changes.drain(), secure);
    (outgoing, response).into_response()
}

/// Token pair from the request cookies; both halves are required.
pub fn persisted_tokens(jar: &CookieJar) -> Option<PersistedTokens> {
    let access_token = jar.get(ACCESS_TOKEN_COOKIE)?.value();
    let refresh_token = jar.get(REFRESH_TOKEN_COOKIE)?.value();
    if access_token.is_empty() || refresh_token.is_empty() {
        return None;
    }
    Some(PersistedTokens {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
    })
}

/// Mirror session transitions into Set-Cookie headers, last change wins.
pub fn apply_auth_changes(
    mut jar: CookieJar,
    changes: impl IntoIterator<Item = AuthChange>,
    secure: bool,
) -> CookieJar {
    for change in changes {
        jar = match change {
            AuthChange::SignedIn(session) | AuthChange::TokenRefreshed(session) => {
                set_session_cookies(jar, &session, secure)
            }
            AuthChange::SignedOut => clear_session_cookies(jar, secure),
        };
    }
    jar
}

pub fn set_session_cookies(jar: CookieJar, session: &Session, secure: bool) -> CookieJar {
    let max_age = Duration::days(SESSION_COOKIE_MAX_AGE_DAYS);
    let jar = jar.add(session_cookie(
        ACCESS_TOKEN_COOKIE,
        session.access_token.clone(),
        secure,
        max_age,
    ));
    match &session.refresh_token {
        Some(refresh) => jar.add(session_cookie(
            REFRESH_TOKEN_COOKIE,
            refresh.clone(),
            secure,
            max_age,
        )),
        None => jar,
    }
}

/// Removal cookies for both session tokens.
///
/// Built explicitly rather than with `CookieJar::remove` so the removal is
/// emitted even when the cookie did not arrive with this request.
pub fn clear_session_cookies(jar: CookieJar, secure: bool) -> CookieJar {
    [ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
        .into_iter()
        .fold(jar, |jar, name| {
            jar.add(session_cookie(name, String::new(), secure, Duration::ZERO))
        })
}

pub fn code_verifier_cookie(verifier: String, secure: bool) -> Cookie<'static> {
    Cookie::build((CODE_VERIFIER_COOKIE, verifier))
        .path(CALLBACK_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::minutes(CODE_VERIFIER_MAX_AGE_MINUTES))
        .build()
}

pub fn clear_code_verifier_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((CODE_VERIFIER_COOKIE, ""))
        .path(CALLBACK_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

fn session_cookie(
    name: &'static str,
    value: String,
    secure: bool,
    max_age: Duration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}
