// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase HTTP client for the auth (GoTrue) and data (PostgREST) APIs.
//!
//! Handles:
//! - Password sign-in, sign-up, sign-out
//! - Access token validation and refresh-token exchange
//! - PKCE authorization code exchange
//! - Table select/insert/update with the caller's bearer token

use super::{BackendError, DataBackend, IdentityBackend, SignUpRequest, TableQuery};
use crate::models::{PendingConfirmation, Session, UserIdentity};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

/// Lifetime assumed when the backend omits both `expires_at` and `expires_in`.
const DEFAULT_SESSION_TTL_SECS: i64 = 3600;

/// Supabase API client.
#[derive(Clone)]
pub struct SupabaseBackend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseBackend {
    /// Create a client for the project at `base_url` using its public API key.
    pub fn new(
        base_url: &str,
        anon_key: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unavailable(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Request builder carrying the project API key.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
    }

    /// POST to the token endpoint with the given grant.
    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, BackendError> {
        let response = self
            .request(reqwest::Method::POST, &self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("Token request failed: {}", e)))?;

        let grant: TokenResponse = check_response_json(response).await?;
        Ok(grant.into_session(Utc::now()))
    }
}

#[async_trait]
impl IdentityBackend for SupabaseBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_up(
        &self,
        request: SignUpRequest<'_>,
    ) -> Result<PendingConfirmation, BackendError> {
        let mut body = json!({
            "email": request.email,
            "password": request.password,
        });
        if let Some(challenge) = request.code_challenge {
            body["code_challenge"] = json!(challenge);
            body["code_challenge_method"] = json!("s256");
        }

        let response = self
            .request(reqwest::Method::POST, &self.auth_url("signup"))
            .query(&[("redirect_to", request.redirect_to)])
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("Sign-up request failed: {}", e)))?;

        let value: Value = check_response_json(response).await?;
        parse_sign_up_response(value, Utc::now())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .request(reqwest::Method::POST, &self.auth_url("logout"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("Logout request failed: {}", e)))?;

        check_response(response).await
    }

    async fn get_user(&self, access_token: &str) -> Result<UserIdentity, BackendError> {
        let response = self
            .request(reqwest::Method::GET, &self.auth_url("user"))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("User request failed: {}", e)))?;

        let user: GoTrueUser = check_response_json(response).await?;
        Ok(user.into())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, BackendError> {
        self.token_grant(
            "pkce",
            json!({ "auth_code": code, "code_verifier": code_verifier.unwrap_or_default() }),
        )
        .await
    }
}

#[async_trait]
impl DataBackend for SupabaseBackend {
    async fn select(
        &self,
        access_token: &str,
        query: &TableQuery,
    ) -> Result<Vec<Value>, BackendError> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query_params(query));

        let response = self
            .request(reqwest::Method::GET, &self.rest_url(query.table))
            .bearer_auth(access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        check_response_json(response).await
    }

    async fn insert(
        &self,
        access_token: &str,
        table: &'static str,
        row: Value,
    ) -> Result<Value, BackendError> {
        let response = self
            .request(reqwest::Method::POST, &self.rest_url(table))
            .bearer_auth(access_token)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let rows: Vec<Value> = check_response_json(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode(format!("insert into {} returned no row", table)))
    }

    async fn update(
        &self,
        access_token: &str,
        query: &TableQuery,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        let response = self
            .request(reqwest::Method::PATCH, &self.rest_url(query.table))
            .bearer_auth(access_token)
            .header("Prefer", "return=representation")
            .query(&query_params(query))
            .json(&patch)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        check_response_json(response).await
    }
}

/// PostgREST query string for the filters and ordering of `query`.
fn query_params(query: &TableQuery) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = query
        .filters
        .iter()
        .map(|(column, value)| (column.to_string(), format!("eq.{}", value)))
        .collect();

    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }

    params
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), BackendError> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| BackendError::Decode(format!("JSON parse error: {}", e)))
}

fn status_error(status: reqwest::StatusCode, body: &str) -> BackendError {
    if status.is_server_error() {
        tracing::warn!(status = status.as_u16(), "Supabase server error");
        return BackendError::Unavailable(format!("HTTP {}", status));
    }

    BackendError::rejected(status.as_u16(), rejection_message(body))
}

/// Pull the human-readable message out of a GoTrue/PostgREST error body.
fn rejection_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.chars().take(200).collect();
    };

    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| "request rejected".to_string())
}

/// User object as returned by GoTrue.
#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<GoTrueUser> for UserIdentity {
    fn from(user: GoTrueUser) -> Self {
        UserIdentity {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let default_expiry = now + Duration::seconds(DEFAULT_SESSION_TTL_SECS);
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| {
                self.expires_in
                    .and_then(Duration::try_seconds)
                    .and_then(|ttl| now.checked_add_signed(ttl))
            })
            .unwrap_or(default_expiry);

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.into(),
        }
    }
}

/// Sign-up answers with a full session when auto-confirm is enabled and with
/// a bare user object when email confirmation is pending.
fn parse_sign_up_response(
    value: Value,
    now: DateTime<Utc>,
) -> Result<PendingConfirmation, BackendError> {
    if value.get("access_token").is_some() {
        let grant: TokenResponse = serde_json::from_value(value)
            .map_err(|e| BackendError::Decode(format!("sign-up session: {}", e)))?;
        let session = grant.into_session(now);
        return Ok(PendingConfirmation {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }

    let user_value = value.get("user").cloned().unwrap_or(value);
    let user: GoTrueUser = serde_json::from_value(user_value)
        .map_err(|e| BackendError::Decode(format!("sign-up user: {}", e)))?;

    Ok(PendingConfirmation {
        user: Some(user.into()),
        session: None,
    })
}
