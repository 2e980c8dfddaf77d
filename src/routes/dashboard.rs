// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Protected dashboard pages and profile/goal forms.
//!
//! The session middleware has already redirected anonymous visitors; the
//! access layer still re-checks identity on every call.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Form, Router,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::RequestAuth;
use crate::routes::forms::{first_message, GoalForm, GoalUpdateForm, ProfileForm};
use crate::services::ProfileService;
use crate::views;
use crate::AppState;

const PROFILE_PATH: &str = "/dashboard/profile";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route(PROFILE_PATH, get(profile_page).post(update_profile))
        .route("/dashboard/goals", post(create_goal))
        .route("/dashboard/goals/{id}", post(update_goal))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RequestAuth>,
) -> Result<Html<String>> {
    let session = auth.session.clone().ok_or(AppError::Unauthenticated)?;
    let dashboard = ProfileService::new(&auth.store, state.data.as_ref())
        .load_dashboard()
        .await?;
    Ok(views::dashboard(&session, &dashboard.goals))
}

async fn profile_page(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RequestAuth>,
) -> Result<Html<String>> {
    let dashboard = ProfileService::new(&auth.store, state.data.as_ref())
        .load_dashboard()
        .await?;
    Ok(views::profile_page(
        dashboard.profile.as_ref(),
        &dashboard.goals,
        None,
    ))
}

/// Re-render the profile page with a form error.
async fn profile_form_error(service: &ProfileService<'_>, message: &str) -> Result<Response> {
    let dashboard = service.load_dashboard().await?;
    let page = views::profile_page(dashboard.profile.as_ref(), &dashboard.goals, Some(message));
    Ok((StatusCode::BAD_REQUEST, page).into_response())
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RequestAuth>,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let service = ProfileService::new(&auth.store, state.data.as_ref());
    if let Err(errors) = form.validate() {
        return profile_form_error(&service, &first_message(&errors)).await;
    }

    service.update_profile(form.into_update()).await?;
    Ok(Redirect::to(PROFILE_PATH).into_response())
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RequestAuth>,
    Form(form): Form<GoalForm>,
) -> Result<Response> {
    let service = ProfileService::new(&auth.store, state.data.as_ref());
    if let Err(errors) = form.validate() {
        return profile_form_error(&service, &first_message(&errors)).await;
    }

    service.create_goal(form.into_new_goal()?).await?;
    Ok(Redirect::to(PROFILE_PATH).into_response())
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<RequestAuth>,
    Path(goal_id): Path<Uuid>,
    Form(form): Form<GoalUpdateForm>,
) -> Result<Response> {
    let service = ProfileService::new(&auth.store, state.data.as_ref());
    if let Err(errors) = form.validate() {
        return profile_form_error(&service, &first_message(&errors)).await;
    }

    service.update_goal(goal_id, form.into_update()).await?;
    Ok(Redirect::to(PROFILE_PATH).into_response())
}
