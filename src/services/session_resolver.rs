// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Decides whether the current request has a live session.

use crate::error::AuthError;
use crate::models::Session;
use crate::services::CredentialStore;

/// Token pair persisted in the browser between requests.
#[derive(Clone, PartialEq, Eq)]
pub struct PersistedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for PersistedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PersistedTokens { .. }")
    }
}

/// How a resolution was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The store already held a live session.
    Cached,
    /// The persisted pair was exchanged for a session.
    Exchanged,
    /// A pair was present but the backend refused it; the pair is stale.
    ExchangeFailed,
    /// A pair was present but the backend could not be reached.
    Unavailable,
    /// Nothing cached and no complete pair to exchange.
    NoCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub session: Option<Session>,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_authenticated(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_live)
    }
}

/// Resolve the session for one request.
///
/// A live cached session always wins. Otherwise a complete persisted pair is
/// exchanged exactly once; any failure leaves the request anonymous.
pub async fn resolve_session(
    store: &CredentialStore,
    persisted: Option<&PersistedTokens>,
) -> Resolution {
    if let Some(session) = store.get_session().await {
        return Resolution {
            session: Some(session),
            source: ResolutionSource::Cached,
        };
    }

    let Some(tokens) = persisted else {
        return Resolution {
            session: None,
            source: ResolutionSource::NoCredentials,
        };
    };

    match store
        .set_session(&tokens.access_token, &tokens.refresh_token)
        .await
    {
        Ok(session) => Resolution {
            session: Some(session),
            source: ResolutionSource::Exchanged,
        },
        Err(err @ AuthError::BackendUnavailable(_)) => {
            tracing::warn!(error = %err, "Session not restored, backend unavailable");
            Resolution {
                session: None,
                source: ResolutionSource::Unavailable,
            }
        }
        Err(err) => {
            tracing::info!(error = %err, "Persisted session could not be restored");
            Resolution {
                session: None,
                source: ResolutionSource::ExchangeFailed,
            }
        }
    }
}
