// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod credential_store;
pub mod pkce;
pub mod profile;
pub mod route_guard;
pub mod session_resolver;

pub use credential_store::{AuthSubscription, CredentialStore};
pub use profile::{Dashboard, ProfileService};
pub use route_guard::{decide, GuardDecision, PathClass};
pub use session_resolver::{resolve_session, PersistedTokens, Resolution, ResolutionSource};
