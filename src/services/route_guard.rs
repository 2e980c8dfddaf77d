// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Path classification and the allow/redirect decision table.

/// Where anonymous visitors to protected pages are sent.
pub const AUTH_ENTRY_PATH: &str = "/auth";

/// Where signed-in visitors to the auth pages are sent.
pub const PROTECTED_LANDING_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Requires a live session.
    Protected,
    /// Sign-in pages; pointless once signed in.
    AuthEntry,
    Public,
}

impl PathClass {
    pub fn of(path: &str) -> Self {
        if matches_prefix(path, PROTECTED_LANDING_PATH) {
            PathClass::Protected
        } else if matches_prefix(path, AUTH_ENTRY_PATH) {
            PathClass::AuthEntry
        } else {
            PathClass::Public
        }
    }
}

/// `prefix` itself or anything below it, but not `/dashboardx`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

pub fn decide(class: PathClass, authenticated: bool) -> GuardDecision {
    match (class, authenticated) {
        (PathClass::Protected, false) => GuardDecision::Redirect(AUTH_ENTRY_PATH),
        (PathClass::AuthEntry, true) => GuardDecision::Redirect(PROTECTED_LANDING_PATH),
        _ => GuardDecision::Allow,
    }
}
