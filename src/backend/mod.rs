// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Capability interfaces for the hosted identity and data backends.
//!
//! Nothing in this crate hashes passwords, signs tokens or executes SQL; those
//! live behind [`IdentityBackend`] and [`DataBackend`]. The production
//! implementation talks to Supabase over HTTP, the in-memory one backs tests.

pub mod http;
pub mod memory;

pub use http::SupabaseBackend;
pub use memory::MemoryBackend;

use crate::models::{PendingConfirmation, Session, UserIdentity};
use async_trait::async_trait;
use serde_json::Value;

/// Table names as constants.
pub mod tables {
    pub const PROFILES: &str = "profiles";
    pub const GOALS: &str = "goals";
}

/// Transport-level failure talking to a backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend answered and refused the request (4xx).
    #[error("Rejected by backend (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network failure or 5xx.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with a body we could not understand.
    #[error("Unexpected backend response: {0}")]
    Decode(String),
}

impl BackendError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        BackendError::Rejected {
            status,
            message: message.into(),
        }
    }
}

/// Parameters of a sign-up call.
#[derive(Debug, Clone, Copy)]
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    /// Where the confirmation link should send the user
    pub redirect_to: &'a str,
    /// PKCE challenge (S256) for the code in the confirmation link
    pub code_challenge: Option<&'a str>,
}

/// Identity service: issues, validates and revokes sessions.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError>;

    async fn sign_up(&self, request: SignUpRequest<'_>)
        -> Result<PendingConfirmation, BackendError>;

    /// Revoke the session the access token belongs to.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Validate an access token and return its owner.
    async fn get_user(&self, access_token: &str) -> Result<UserIdentity, BackendError>;

    /// Trade a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError>;

    /// Trade an authorization code (from an email link) for a session.
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, BackendError>;
}

/// Column ordering for a select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

/// Table-scoped query with equality filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: &'static str,
    pub filters: Vec<(&'static str, String)>,
    pub order: Option<Order>,
}

impl TableQuery {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
        }
    }

    /// Add a `column = value` filter.
    pub fn eq(mut self, column: &'static str, value: impl ToString) -> Self {
        self.filters.push((column, value.to_string()));
        self
    }

    pub fn order_by(mut self, column: &'static str, ascending: bool) -> Self {
        self.order = Some(Order { column, ascending });
        self
    }
}

/// Relational store with row-level ownership enforcement.
///
/// Every call runs with the caller's access token so the backend's row-level
/// policies decide what is visible; this crate adds its own ownership filters
/// on top but never relies on them alone.
#[async_trait]
pub trait DataBackend: Send + Sync {
    async fn select(&self, access_token: &str, query: &TableQuery)
        -> Result<Vec<Value>, BackendError>;

    /// Insert a row and return it as stored.
    async fn insert(
        &self,
        access_token: &str,
        table: &'static str,
        row: Value,
    ) -> Result<Value, BackendError>;

    /// Patch every row matching `query` and return the updated rows.
    async fn update(
        &self,
        access_token: &str,
        query: &TableQuery,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError>;
}
