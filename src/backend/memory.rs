// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory identity and data backend for tests and offline development.
//!
//! Behaves like the hosted service where this crate can observe it: tokens
//! are HS256 JWTs with a real `exp`, refresh tokens rotate on use, sign-out
//! revokes, PKCE codes are checked against their challenge, and every table
//! read/write is filtered by row ownership. Each operation is counted so
//! tests can assert which backend calls happened.

use super::{BackendError, DataBackend, IdentityBackend, SignUpRequest, TableQuery};
use crate::models::{PendingConfirmation, Session, UserIdentity};
use crate::services::pkce::challenge_for;
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const SIGNING_KEY: &[u8] = b"fitforge-memory-backend-signing-key";
const ACCESS_TOKEN_TTL_SECS: i64 = 3600;
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
struct Account {
    user: UserIdentity,
    password: String,
    confirmed: bool,
}

#[derive(Clone)]
struct IssuedToken {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    refresh_token: String,
}

#[derive(Clone)]
struct PendingCode {
    email: String,
    code_challenge: Option<String>,
}

#[derive(Serialize)]
struct AccessClaims {
    sub: String,
    email: String,
    aud: &'static str,
    exp: i64,
    iat: i64,
    jti: String,
}

#[derive(Default)]
struct Inner {
    /// Accounts keyed by email
    accounts: DashMap<String, Account>,
    access_tokens: DashMap<String, IssuedToken>,
    /// Refresh token -> user ID
    refresh_tokens: DashMap<String, Uuid>,
    codes: DashMap<String, PendingCode>,
    tables: DashMap<String, Vec<Value>>,
    calls: DashMap<&'static str, usize>,
    unavailable: AtomicBool,
    auto_confirm: AtomicBool,
}

/// In-memory backend. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Whether sign-up returns a session immediately instead of a pending confirmation.
    pub fn set_auto_confirm(&self, auto_confirm: bool) {
        self.inner.auto_confirm.store(auto_confirm, Ordering::SeqCst);
    }

    /// Create a confirmed account with an empty profile row.
    pub fn register_user(&self, email: &str, password: &str) -> UserIdentity {
        self.create_account(email, password, true)
    }

    /// Number of times `operation` was called (e.g. `"refresh"`, `"get_user"`).
    pub fn call_count(&self, operation: &str) -> usize {
        self.inner.calls.get(operation).map(|c| *c).unwrap_or(0)
    }

    /// Raw table contents, bypassing row ownership.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.inner
            .tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    /// Code from the confirmation email sent at sign-up, if one is pending.
    pub fn pending_code(&self, email: &str) -> Option<String> {
        self.inner
            .codes
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.key().clone())
    }

    /// Issue an authorization code for an existing account without a PKCE challenge.
    pub fn issue_code(&self, email: &str) -> String {
        let code = Uuid::new_v4().simple().to_string();
        self.inner.codes.insert(
            code.clone(),
            PendingCode {
                email: email.to_string(),
                code_challenge: None,
            },
        );
        code
    }

    /// Issue a session whose access token has already expired but whose
    /// refresh token is still valid.
    pub fn expired_session(&self, email: &str) -> Option<Session> {
        let account = self.inner.accounts.get(email)?.clone();
        self.issue_session(&account.user, Duration::seconds(-60)).ok()
    }

    fn create_account(&self, email: &str, password: &str, confirmed: bool) -> UserIdentity {
        let user = UserIdentity {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        self.inner.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed,
            },
        );

        // The hosted schema creates the profile row from a trigger on signup.
        let now = format_utc_rfc3339(Utc::now());
        self.inner
            .tables
            .entry(super::tables::PROFILES.to_string())
            .or_default()
            .push(json!({
                "id": user.id,
                "created_at": now,
                "updated_at": now,
                "username": null,
                "full_name": null,
                "avatar_url": null,
                "height": null,
                "weight": null,
                "date_of_birth": null,
            }));

        user
    }

    fn record(&self, operation: &'static str) -> Result<(), BackendError> {
        *self.inner.calls.entry(operation).or_insert(0) += 1;
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "memory backend offline".to_string(),
            ));
        }
        Ok(())
    }

    fn issue_session(&self, user: &UserIdentity, ttl: Duration) -> Result<Session, BackendError> {
        let now = Utc::now();
        let exp = (now + ttl).timestamp();
        let claims = AccessClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            aud: "authenticated",
            exp,
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SIGNING_KEY),
        )
        .map_err(|e| BackendError::Decode(format!("JWT encoding failed: {}", e)))?;

        let expires_at = DateTime::from_timestamp(exp, 0).unwrap_or(now + ttl);
        let refresh_token = Uuid::new_v4().simple().to_string();

        self.inner.access_tokens.insert(
            access_token.clone(),
            IssuedToken {
                user_id: user.id,
                expires_at,
                refresh_token: refresh_token.clone(),
            },
        );
        self.inner
            .refresh_tokens
            .insert(refresh_token.clone(), user.id);

        Ok(Session {
            access_token,
            refresh_token: Some(refresh_token),
            expires_at,
            user: user.clone(),
        })
    }

    fn find_user(&self, user_id: Uuid) -> Option<UserIdentity> {
        self.inner
            .accounts
            .iter()
            .find(|entry| entry.value().user.id == user_id)
            .map(|entry| entry.value().user.clone())
    }

    fn user_for_token(&self, access_token: &str) -> Result<UserIdentity, BackendError> {
        let token = self
            .inner
            .access_tokens
            .get(access_token)
            .map(|t| t.clone())
            .ok_or_else(|| BackendError::rejected(401, "invalid JWT"))?;

        if token.expires_at <= Utc::now() {
            return Err(BackendError::rejected(401, "JWT expired"));
        }

        self.find_user(token.user_id)
            .ok_or_else(|| BackendError::rejected(401, "user not found"))
    }
}

#[async_trait]
impl IdentityBackend for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.record("sign_in")?;

        let account = self
            .inner
            .accounts
            .get(email)
            .map(|a| a.clone())
            .filter(|a| a.password == password)
            .ok_or_else(|| BackendError::rejected(400, "Invalid login credentials"))?;

        if !account.confirmed {
            return Err(BackendError::rejected(400, "Email not confirmed"));
        }

        self.issue_session(&account.user, Duration::seconds(ACCESS_TOKEN_TTL_SECS))
    }

    async fn sign_up(
        &self,
        request: SignUpRequest<'_>,
    ) -> Result<PendingConfirmation, BackendError> {
        self.record("sign_up")?;

        if self.inner.accounts.contains_key(request.email) {
            return Err(BackendError::rejected(422, "User already registered"));
        }
        if request.password.len() < MIN_PASSWORD_LEN {
            return Err(BackendError::rejected(
                422,
                "Password should be at least 6 characters",
            ));
        }

        let auto_confirm = self.inner.auto_confirm.load(Ordering::SeqCst);
        let user = self.create_account(request.email, request.password, auto_confirm);

        if auto_confirm {
            let session = self.issue_session(&user, Duration::seconds(ACCESS_TOKEN_TTL_SECS))?;
            return Ok(PendingConfirmation {
                user: Some(user),
                session: Some(session),
            });
        }

        self.inner.codes.insert(
            Uuid::new_v4().simple().to_string(),
            PendingCode {
                email: request.email.to_string(),
                code_challenge: request.code_challenge.map(str::to_string),
            },
        );

        Ok(PendingConfirmation {
            user: Some(user),
            session: None,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.record("sign_out")?;

        let (_, token) = self
            .inner
            .access_tokens
            .remove(access_token)
            .ok_or_else(|| BackendError::rejected(401, "invalid JWT"))?;
        self.inner.refresh_tokens.remove(&token.refresh_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<UserIdentity, BackendError> {
        self.record("get_user")?;
        self.user_for_token(access_token)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.record("refresh")?;

        let (_, user_id) = self
            .inner
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| {
                BackendError::rejected(400, "Invalid Refresh Token: Refresh Token Not Found")
            })?;
        let user = self
            .find_user(user_id)
            .ok_or_else(|| BackendError::rejected(400, "user not found"))?;

        self.issue_session(&user, Duration::seconds(ACCESS_TOKEN_TTL_SECS))
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, BackendError> {
        self.record("exchange_code")?;

        let pending = self
            .inner
            .codes
            .get(code)
            .map(|p| p.clone())
            .ok_or_else(|| {
                BackendError::rejected(404, "invalid flow state, no valid flow state found")
            })?;

        if let Some(challenge) = &pending.code_challenge {
            let verified = code_verifier.is_some_and(|v| challenge_for(v) == *challenge);
            if !verified {
                return Err(BackendError::rejected(
                    400,
                    "code challenge does not match previously saved code verifier",
                ));
            }
        }

        self.inner.codes.remove(code);
        let user = {
            let mut account = self
                .inner
                .accounts
                .get_mut(&pending.email)
                .ok_or_else(|| BackendError::rejected(400, "user not found"))?;
            account.confirmed = true;
            account.user.clone()
        };

        self.issue_session(&user, Duration::seconds(ACCESS_TOKEN_TTL_SECS))
    }
}

/// Column that must equal the requesting user's ID for a row to be visible.
fn owner_column(table: &str) -> Result<&'static str, BackendError> {
    match table {
        super::tables::PROFILES => Ok("id"),
        super::tables::GOALS => Ok("user_id"),
        other => Err(BackendError::rejected(
            404,
            format!("relation \"{}\" does not exist", other),
        )),
    }
}

fn field_matches(field: Option<&Value>, expected: &str) -> bool {
    match field {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

fn row_matches(row: &Value, owner: &str, user_id: &str, query: &TableQuery) -> bool {
    field_matches(row.get(owner), user_id)
        && query
            .filters
            .iter()
            .all(|(column, value)| field_matches(row.get(*column), value))
}

fn as_object(value: Value) -> Result<Map<String, Value>, BackendError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(BackendError::rejected(400, "expected a JSON object")),
    }
}

fn rls_violation(table: &str) -> BackendError {
    BackendError::rejected(
        403,
        format!("new row violates row-level security policy for table \"{}\"", table),
    )
}

#[async_trait]
impl DataBackend for MemoryBackend {
    async fn select(
        &self,
        access_token: &str,
        query: &TableQuery,
    ) -> Result<Vec<Value>, BackendError> {
        self.record("select")?;
        let user = self.user_for_token(access_token)?;
        let owner = owner_column(query.table)?;
        let user_id = user.id.to_string();

        let mut rows: Vec<Value> = self
            .rows(query.table)
            .into_iter()
            .filter(|row| row_matches(row, owner, &user_id, query))
            .collect();

        if let Some(order) = &query.order {
            // Newest insert first among equal keys when descending.
            if !order.ascending {
                rows.reverse();
            }
            let key = |row: &Value| {
                row.get(order.column)
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .unwrap_or_default()
            };
            rows.sort_by(|a, b| {
                let ordering = key(a).cmp(&key(b));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows)
    }

    async fn insert(
        &self,
        access_token: &str,
        table: &'static str,
        row: Value,
    ) -> Result<Value, BackendError> {
        self.record("insert")?;
        let user = self.user_for_token(access_token)?;
        let owner = owner_column(table)?;

        let mut row = as_object(row)?;
        if !field_matches(row.get(owner), &user.id.to_string()) {
            return Err(rls_violation(table));
        }
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));

        let row = Value::Object(row);
        self.inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        access_token: &str,
        query: &TableQuery,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        self.record("update")?;
        let user = self.user_for_token(access_token)?;
        let owner = owner_column(query.table)?;
        let user_id = user.id.to_string();

        let patch = as_object(patch)?;
        if patch.contains_key(owner) && !field_matches(patch.get(owner), &user_id) {
            return Err(rls_violation(query.table));
        }

        let mut updated = Vec::new();
        if let Some(mut rows) = self.inner.tables.get_mut(query.table) {
            for row in rows.iter_mut() {
                if !row_matches(row, owner, &user_id, query) {
                    continue;
                }
                if let Value::Object(fields) = row {
                    for (key, value) in &patch {
                        fields.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
        }

        Ok(updated)
    }
}
