// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FitForge: fitness tracking web server.
//!
//! Users authenticate against a hosted identity service, maintain a profile
//! and record goals. Every request gets its own credential store; a router
//! wide guard decides access to the dashboard before any handler runs.

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod views;

use backend::{DataBackend, IdentityBackend};
use config::Config;
use std::sync::Arc;

/// Shared application state.
///
/// Holds only stateless handles; session state lives in the per-request
/// credential store.
pub struct AppState {
    pub config: Config,
    pub identity: Arc<dyn IdentityBackend>,
    pub data: Arc<dyn DataBackend>,
}
