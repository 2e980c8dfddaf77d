// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod goal;
pub mod profile;
pub mod session;

pub use goal::{Goal, GoalUpdate, NewGoal};
pub use profile::{Profile, ProfileUpdate};
pub use session::{AuthChange, PendingConfirmation, Session, UserIdentity};
