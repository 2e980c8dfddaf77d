// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store: the session cache in front of the identity backend.
//!
//! Server-side there is exactly one store per inbound request, so the cached
//! session never crosses from one user's request into another's. The backend
//! handle it wraps is shared and stateless.

use crate::backend::{BackendError, IdentityBackend, SignUpRequest};
use crate::error::AuthError;
use crate::models::{AuthChange, PendingConfirmation, Session, UserIdentity};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Buffered auth events per subscriber before the oldest are dropped.
const AUTH_EVENT_CAPACITY: usize = 16;

/// Session cache plus auth operations for one trust boundary.
pub struct CredentialStore {
    identity: Arc<dyn IdentityBackend>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthChange>,
}

impl CredentialStore {
    /// Create an empty store (anonymous until something signs in).
    pub fn new(identity: Arc<dyn IdentityBackend>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            identity,
            session: RwLock::new(None),
            events,
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self
            .identity
            .sign_in_with_password(email, password)
            .await
            .map_err(|err| match err {
                BackendError::Rejected { message, .. } => {
                    tracing::info!(reason = %message, "Sign-in rejected");
                    AuthError::InvalidCredentials
                }
                other => unavailable(other),
            })?;

        tracing::info!(user_id = %session.user.id, "User signed in");
        self.store(session.clone(), AuthChange::SignedIn(session.clone()))
            .await;
        Ok(session)
    }

    /// Register a new account.
    ///
    /// Only caches a session if the backend confirmed the account on the spot.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
        code_challenge: Option<&str>,
    ) -> Result<PendingConfirmation, AuthError> {
        let pending = self
            .identity
            .sign_up(SignUpRequest {
                email,
                password,
                redirect_to,
                code_challenge,
            })
            .await
            .map_err(|err| match err {
                BackendError::Rejected { message, .. } => AuthError::Rejected(message),
                other => unavailable(other),
            })?;

        match &pending.session {
            Some(session) => {
                tracing::info!(user_id = %session.user.id, "Sign-up confirmed immediately");
                self.store(session.clone(), AuthChange::SignedIn(session.clone()))
                    .await;
            }
            None => tracing::info!("Sign-up pending email confirmation"),
        }

        Ok(pending)
    }

    /// Sign out: revoke the session with the backend and always drop the cache.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = self.session.write().await.take();
        self.publish(AuthChange::SignedOut);

        let Some(session) = previous else {
            return Ok(());
        };

        tracing::info!(user_id = %session.user.id, "User signed out");
        match self.identity.sign_out(&session.access_token).await {
            Ok(()) => Ok(()),
            // Token already invalid server-side; nothing left to revoke.
            Err(BackendError::Rejected { status: 401, .. }) => Ok(()),
            Err(BackendError::Rejected { message, .. }) => Err(AuthError::Rejected(message)),
            Err(other) => Err(unavailable(other)),
        }
    }

    /// Cached session, if it is still live. Never touches the network.
    pub async fn get_session(&self) -> Option<Session> {
        self.session
            .read()
            .await
            .as_ref()
            .filter(|session| session.is_live())
            .cloned()
    }

    /// Identity of the live cached session.
    pub async fn get_user(&self) -> Option<UserIdentity> {
        self.get_session().await.map(|session| session.user)
    }

    /// Establish a session from a persisted access/refresh token pair.
    ///
    /// An unexpired access token is validated with the backend; an expired or
    /// rejected one is replaced through the refresh token. Anything else fails.
    pub async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError> {
        let now = Utc::now();

        if let Some(expires_at) = token_expiry(access_token).filter(|exp| *exp > now) {
            match self.identity.get_user(access_token).await {
                Ok(user) => {
                    let session = Session {
                        access_token: access_token.to_string(),
                        refresh_token: Some(refresh_token.to_string()),
                        expires_at,
                        user,
                    };
                    self.store(session.clone(), AuthChange::SignedIn(session.clone()))
                        .await;
                    return Ok(session);
                }
                Err(BackendError::Rejected { message, .. }) => {
                    tracing::debug!(reason = %message, "Access token rejected, trying refresh");
                }
                Err(other) => return Err(unavailable(other)),
            }
        }

        let session = self
            .identity
            .refresh_session(refresh_token)
            .await
            .map_err(|err| match err {
                BackendError::Rejected { message, .. } => AuthError::ExchangeFailed(message),
                other => unavailable(other),
            })?;

        tracing::debug!(user_id = %session.user.id, "Session refreshed");
        self.store(session.clone(), AuthChange::TokenRefreshed(session.clone()))
            .await;
        Ok(session)
    }

    /// Trade the authorization code from an email link for a session.
    pub async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Session, AuthError> {
        let session = self
            .identity
            .exchange_code_for_session(code, code_verifier)
            .await
            .map_err(|err| match err {
                BackendError::Rejected { message, .. } => AuthError::ExchangeFailed(message),
                other => unavailable(other),
            })?;

        tracing::info!(user_id = %session.user.id, "Authorization code exchanged");
        self.store(session.clone(), AuthChange::SignedIn(session.clone()))
            .await;
        Ok(session)
    }

    /// Subscribe to session transitions from this point on.
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            receiver: self.events.subscribe(),
        }
    }

    async fn store(&self, session: Session, change: AuthChange) {
        *self.session.write().await = Some(session);
        self.publish(change);
    }

    fn publish(&self, change: AuthChange) {
        // No subscribers is fine.
        let _ = self.events.send(change);
    }
}

/// Handle on the auth event stream. Dropping it unsubscribes.
pub struct AuthSubscription {
    receiver: broadcast::Receiver<AuthChange>,
}

impl AuthSubscription {
    /// Wait for the next change; `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<AuthChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Every change already published, in order, without waiting.
    pub fn drain(&mut self) -> Vec<AuthChange> {
        let mut changes = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(change) => changes.push(change),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth subscriber lagged, events dropped");
                }
                Err(_) => return changes,
            }
        }
    }

    pub fn unsubscribe(self) {}
}

fn unavailable(err: BackendError) -> AuthError {
    tracing::warn!(error = %err, "Identity backend call failed");
    AuthError::BackendUnavailable(err.to_string())
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// `exp` claim of an access token, read without verifying the signature.
///
/// Only used to skip a pointless validation round-trip for tokens that are
/// already expired; the backend remains the authority on validity.
fn token_expiry(access_token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaim>(access_token, &DecodingKey::from_secret(&[]), &validation)
        .ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use chrono::Duration;

    const PASSWORD: &str = "hunter22";

    fn store_with_user(email: &str) -> (CredentialStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        backend.register_user(email, PASSWORD);
        (CredentialStore::new(Arc::new(backend.clone())), backend)
    }

    #[tokio::test]
    async fn test_sign_in_then_get_user() {
        let (store, _) = store_with_user("runner@example.com");

        let session = store.sign_in("runner@example.com", PASSWORD).await.unwrap();
        assert!(!session.access_token.is_empty());

        let user = store.get_user().await.unwrap();
        assert_eq!(user, session.user);
        assert_eq!(user.email, "runner@example.com");
    }

    #[tokio::test]
    async fn test_sign_in_rejection_is_invalid_credentials() {
        let (store, _) = store_with_user("runner@example.com");

        let err = store.sign_in("runner@example.com", "nope").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert!(store.get_session().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_backend_down() {
        let (store, backend) = store_with_user("runner@example.com");
        backend.set_unavailable(true);

        let err = store.sign_in("runner@example.com", PASSWORD).await.unwrap_err();
        assert!(matches!(err, AuthError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_get_session_is_idempotent() {
        let (store, backend) = store_with_user("runner@example.com");
        store.sign_in("runner@example.com", PASSWORD).await.unwrap();

        let calls_before = backend.call_count("get_user") + backend.call_count("refresh");
        let first = store.get_session().await;
        let second = store.get_session().await;

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(
            backend.call_count("get_user") + backend.call_count("refresh"),
            calls_before
        );
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let (store, backend) = store_with_user("runner@example.com");
        store.sign_in("runner@example.com", PASSWORD).await.unwrap();

        store.sign_out().await.unwrap();
        assert!(store.get_session().await.is_none());
        assert!(store.get_user().await.is_none());
        assert_eq!(backend.call_count("sign_out"), 1);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session_even_when_backend_fails() {
        let (store, backend) = store_with_user("runner@example.com");
        store.sign_in("runner@example.com", PASSWORD).await.unwrap();
        backend.set_unavailable(true);

        assert!(store.sign_out().await.is_err());
        assert!(store.get_session().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_cached_session_reads_as_none() {
        let (store, _) = store_with_user("runner@example.com");
        let mut session = store.sign_in("runner@example.com", PASSWORD).await.unwrap();
        session.expires_at = Utc::now() - Duration::seconds(1);
        *store.session.write().await = Some(session);

        assert!(store.get_session().await.is_none());
        assert!(store.get_user().await.is_none());
    }

    #[tokio::test]
    async fn test_set_session_validates_live_token() {
        let backend = MemoryBackend::new();
        backend.register_user("runner@example.com", PASSWORD);
        let issued = backend
            .sign_in_with_password("runner@example.com", PASSWORD)
            .await
            .unwrap();

        let store = CredentialStore::new(Arc::new(backend.clone()));
        let session = store
            .set_session(&issued.access_token, issued.refresh_token.as_deref().unwrap())
            .await
            .unwrap();

        assert_eq!(session.access_token, issued.access_token);
        assert_eq!(session.expires_at, issued.expires_at);
        assert_eq!(backend.call_count("get_user"), 1);
        assert_eq!(backend.call_count("refresh"), 0);
    }

    #[tokio::test]
    async fn test_set_session_refreshes_expired_token() {
        let backend = MemoryBackend::new();
        backend.register_user("runner@example.com", PASSWORD);
        let expired = backend.expired_session("runner@example.com").unwrap();

        let store = CredentialStore::new(Arc::new(backend.clone()));
        let mut changes = store.subscribe();
        let session = store
            .set_session(&expired.access_token, expired.refresh_token.as_deref().unwrap())
            .await
            .unwrap();

        assert_ne!(session.access_token, expired.access_token);
        assert!(session.is_live());
        // Expired tokens skip the validation round-trip.
        assert_eq!(backend.call_count("get_user"), 0);
        assert_eq!(backend.call_count("refresh"), 1);
        assert_eq!(changes.drain(), vec![AuthChange::TokenRefreshed(session)]);
    }

    #[tokio::test]
    async fn test_set_session_with_garbage_tokens_fails() {
        let backend = MemoryBackend::new();
        let store = CredentialStore::new(Arc::new(backend));

        let err = store.set_session("not-a-jwt", "not-a-token").await.unwrap_err();
        assert!(matches!(err, AuthError::ExchangeFailed(_)));
        assert!(store.get_session().await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_sees_changes_in_order() {
        let (store, _) = store_with_user("runner@example.com");
        let mut changes = store.subscribe();

        let session = store.sign_in("runner@example.com", PASSWORD).await.unwrap();
        store.sign_out().await.unwrap();

        assert_eq!(changes.recv().await, Some(AuthChange::SignedIn(session)));
        assert_eq!(changes.recv().await, Some(AuthChange::SignedOut));
        assert!(changes.drain().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let (store, _) = store_with_user("runner@example.com");
        let changes = store.subscribe();
        changes.unsubscribe();

        // Publishing with no subscribers must not fail the operation.
        store.sign_in("runner@example.com", PASSWORD).await.unwrap();
        assert_eq!(store.events.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_sign_up_without_confirmation_caches_nothing() {
        let backend = MemoryBackend::new();
        let store = CredentialStore::new(Arc::new(backend));

        let pending = store
            .sign_up("new@example.com", PASSWORD, "http://localhost:3000/api/auth/callback", None)
            .await
            .unwrap();

        assert!(pending.requires_confirmation());
        assert!(store.get_session().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_is_rejected() {
        let (store, _) = store_with_user("runner@example.com");

        let err = store
            .sign_up("runner@example.com", PASSWORD, "http://localhost:3000", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
    }

    #[test]
    fn test_token_expiry_reads_exp_claim() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        #[derive(serde::Serialize)]
        struct Claims {
            sub: &'static str,
            aud: &'static str,
            exp: i64,
        }

        let token = encode(
            &Header::default(),
            &Claims {
                sub: "user",
                aud: "authenticated",
                exp: 1_900_000_000,
            },
            &EncodingKey::from_secret(b"some other key"),
        )
        .unwrap();

        assert_eq!(
            token_expiry(&token).map(|t| t.timestamp()),
            Some(1_900_000_000)
        );
        assert_eq!(token_expiry("garbage"), None);
    }
}
