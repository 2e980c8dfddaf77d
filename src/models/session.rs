// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and identity types shared by the credential store and the guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user as reported by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable user ID (also the profile row ID)
    pub id: Uuid,
    pub email: String,
}

/// Proof of authentication issued by the identity backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Instant after which the access token no longer authorizes anything
    pub expires_at: DateTime<Utc>,
    pub user: UserIdentity,
}

impl Session {
    /// Whether the session still authorizes access at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_live(&self) -> bool {
        self.is_live_at(Utc::now())
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish_non_exhaustive()
    }
}

/// Session transitions published by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChange {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

/// Result of a sign-up.
///
/// The backend may require email confirmation before it hands out a session,
/// so `session` is frequently `None` here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub user: Option<UserIdentity>,
    pub session: Option<Session>,
}

impl PendingConfirmation {
    pub fn requires_confirmation(&self) -> bool {
        self.session.is_none()
    }
}
