// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile and goal reads/writes on behalf of the signed-in user.
//!
//! Every operation first re-derives the caller's identity from the credential
//! store. Without a live session it fails with `Unauthenticated` before any
//! backend call. Ownership columns (`profiles.id`, `goals.user_id`) always come
//! from that identity, never from caller input.

use crate::backend::{tables, DataBackend, TableQuery};
use crate::error::{AppError, Result};
use crate::models::{Goal, GoalUpdate, NewGoal, Profile, ProfileUpdate, Session};
use crate::services::CredentialStore;
use crate::time_utils::format_utc_rfc3339;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Profile and goals shown on the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub profile: Option<Profile>,
    pub goals: Vec<Goal>,
}

/// Access layer bound to one request's credential store.
pub struct ProfileService<'a> {
    store: &'a CredentialStore,
    data: &'a dyn DataBackend,
}

impl<'a> ProfileService<'a> {
    pub fn new(store: &'a CredentialStore, data: &'a dyn DataBackend) -> Self {
        Self { store, data }
    }

    /// Profile plus goals (newest first), fetched concurrently.
    pub async fn load_dashboard(&self) -> Result<Dashboard> {
        let session = self.current_session().await?;
        let token = session.access_token.as_str();
        let user_id = session.user.id;

        let profile_query = TableQuery::new(tables::PROFILES).eq("id", user_id);
        let goals_query = TableQuery::new(tables::GOALS)
            .eq("user_id", user_id)
            .order_by("created_at", false);

        let (profile_rows, goal_rows) = tokio::try_join!(
            self.data.select(token, &profile_query),
            self.data.select(token, &goals_query),
        )?;

        let profile = profile_rows
            .into_iter()
            .next()
            .map(parse_row::<Profile>)
            .transpose()?;
        let goals = goal_rows
            .into_iter()
            .map(parse_row::<Goal>)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(user_id = %user_id, goals = goals.len(), "Dashboard loaded");
        Ok(Dashboard { profile, goals })
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile> {
        let session = self.current_session().await?;
        let user_id = session.user.id;

        let mut patch = to_object(&update)?;
        patch.insert("updated_at".into(), json!(format_utc_rfc3339(Utc::now())));

        let rows = self
            .data
            .update(
                &session.access_token,
                &TableQuery::new(tables::PROFILES).eq("id", user_id),
                Value::Object(patch),
            )
            .await?;

        let profile = single_row::<Profile>(rows, "Profile")?;
        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(profile)
    }

    pub async fn create_goal(&self, goal: NewGoal) -> Result<Goal> {
        let session = self.current_session().await?;
        let user_id = session.user.id;

        if let Some(claimed) = goal.user_id.filter(|claimed| *claimed != user_id) {
            tracing::warn!(
                user_id = %user_id,
                claimed_user_id = %claimed,
                "Ignoring user_id supplied with new goal"
            );
        }

        let now = format_utc_rfc3339(Utc::now());
        let mut row = to_object(&goal)?;
        row.insert("user_id".into(), json!(user_id));
        row.insert("completed".into(), json!(false));
        row.insert("completed_date".into(), Value::Null);
        row.insert("created_at".into(), json!(now));
        row.insert("updated_at".into(), json!(now));

        let stored = self
            .data
            .insert(&session.access_token, tables::GOALS, Value::Object(row))
            .await?;
        let goal = parse_row::<Goal>(stored)?;

        tracing::info!(user_id = %user_id, goal_id = %goal.id, "Goal created");
        Ok(goal)
    }

    /// Patch one of the caller's goals.
    ///
    /// Marking a goal complete without a completion date stamps today's date.
    pub async fn update_goal(&self, goal_id: Uuid, mut update: GoalUpdate) -> Result<Goal> {
        let session = self.current_session().await?;
        let user_id = session.user.id;

        if update.completed == Some(true) && update.completed_date.is_none() {
            update.completed_date = Some(Utc::now().date_naive());
        }

        let mut patch = to_object(&update)?;
        if update.completed == Some(false) {
            patch.insert("completed_date".into(), Value::Null);
        }
        patch.insert("updated_at".into(), json!(format_utc_rfc3339(Utc::now())));

        let rows = self
            .data
            .update(
                &session.access_token,
                &TableQuery::new(tables::GOALS)
                    .eq("id", goal_id)
                    .eq("user_id", user_id),
                Value::Object(patch),
            )
            .await?;

        let goal = single_row::<Goal>(rows, "Goal")?;
        tracing::info!(user_id = %user_id, goal_id = %goal_id, "Goal updated");
        Ok(goal)
    }

    async fn current_session(&self) -> Result<Session> {
        self.store
            .get_session()
            .await
            .ok_or(AppError::Unauthenticated)
    }
}

fn to_object<T: serde::Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Internal(anyhow::anyhow!("expected a JSON object"))),
        Err(e) => Err(AppError::Internal(e.into())),
    }
}

fn parse_row<T: DeserializeOwned>(row: Value) -> Result<T> {
    serde_json::from_value(row).map_err(|e| AppError::Database(format!("Malformed row: {}", e)))
}

fn single_row<T: DeserializeOwned>(rows: Vec<Value>, what: &str) -> Result<T> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(what.to_string()))?;
    parse_row(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use chrono::NaiveDate;
    use std::sync::Arc;

    const PASSWORD: &str = "hunter22";

    async fn signed_in(backend: &MemoryBackend, email: &str) -> CredentialStore {
        backend.register_user(email, PASSWORD);
        let store = CredentialStore::new(Arc::new(backend.clone()));
        store.sign_in(email, PASSWORD).await.unwrap();
        store
    }

    fn new_goal(title: &str) -> NewGoal {
        NewGoal {
            user_id: None,
            title: title.to_string(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            target_date: None,
            goal_type: "endurance".to_string(),
            target_value: Some(42.2),
            current_value: Some(10.0),
            unit: Some("km".to_string()),
        }
    }

    #[tokio::test]
    async fn test_anonymous_calls_fail_without_backend_access() {
        let backend = MemoryBackend::new();
        let store = CredentialStore::new(Arc::new(backend.clone()));
        let service = ProfileService::new(&store, &backend);

        assert!(matches!(
            service.load_dashboard().await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            service.create_goal(new_goal("Marathon")).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            service.update_profile(ProfileUpdate::default()).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            service
                .update_goal(Uuid::new_v4(), GoalUpdate::default())
                .await,
            Err(AppError::Unauthenticated)
        ));

        assert_eq!(backend.call_count("select"), 0);
        assert_eq!(backend.call_count("insert"), 0);
        assert_eq!(backend.call_count("update"), 0);
    }

    #[tokio::test]
    async fn test_create_goal_forces_owner() {
        let backend = MemoryBackend::new();
        let store = signed_in(&backend, "runner@example.com").await;
        let me = store.get_user().await.unwrap();
        let service = ProfileService::new(&store, &backend);

        let mut goal = new_goal("Marathon");
        goal.user_id = Some(Uuid::new_v4());
        let created = service.create_goal(goal).await.unwrap();

        assert_eq!(created.user_id, me.id);
        assert!(!created.completed);
        assert_eq!(backend.rows(tables::GOALS).len(), 1);
    }

    #[tokio::test]
    async fn test_dashboard_lists_goals_newest_first() {
        let backend = MemoryBackend::new();
        let store = signed_in(&backend, "runner@example.com").await;
        let service = ProfileService::new(&store, &backend);

        service.create_goal(new_goal("First")).await.unwrap();
        service.create_goal(new_goal("Second")).await.unwrap();

        let dashboard = service.load_dashboard().await.unwrap();
        assert!(dashboard.profile.is_some());
        let titles: Vec<_> = dashboard.goals.iter().map(|g| g.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let backend = MemoryBackend::new();
        let store = signed_in(&backend, "runner@example.com").await;
        let service = ProfileService::new(&store, &backend);

        let profile = service
            .update_profile(ProfileUpdate {
                full_name: Some("Ada Runner".to_string()),
                height: Some(170.0),
                weight: Some(62.5),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17),
            })
            .await
            .unwrap();

        assert_eq!(profile.id, store.get_user().await.unwrap().id);
        assert_eq!(profile.full_name.as_deref(), Some("Ada Runner"));
        assert_eq!(profile.weight, Some(62.5));
    }

    #[tokio::test]
    async fn test_completing_goal_stamps_date() {
        let backend = MemoryBackend::new();
        let store = signed_in(&backend, "runner@example.com").await;
        let service = ProfileService::new(&store, &backend);
        let goal = service.create_goal(new_goal("Marathon")).await.unwrap();

        let updated = service
            .update_goal(
                goal.id,
                GoalUpdate {
                    completed: Some(true),
                    current_value: Some(42.2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.completed);
        assert_eq!(updated.completed_date, Some(Utc::now().date_naive()));
        assert_eq!(updated.current_value, Some(42.2));
    }

    #[tokio::test]
    async fn test_cannot_update_someone_elses_goal() {
        let backend = MemoryBackend::new();
        let alice = signed_in(&backend, "alice@example.com").await;
        let bob = signed_in(&backend, "bob@example.com").await;

        let goal = ProfileService::new(&alice, &backend)
            .create_goal(new_goal("Alice's goal"))
            .await
            .unwrap();

        let result = ProfileService::new(&bob, &backend)
            .update_goal(
                goal.id,
                GoalUpdate {
                    title: Some("Bob's now".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
