// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Form bodies posted by the server-rendered pages.
//!
//! Browsers submit empty inputs as empty strings, so optional numbers and
//! dates arrive as `String` and are parsed after validation.

use crate::error::AppError;
use crate::models::{GoalUpdate, NewGoal, ProfileUpdate};
use chrono::NaiveDate;
use serde::Deserialize;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize, Validate)]
pub struct SignInForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpForm {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, max = 72, message = "Password must be 6 to 72 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(length(max = 200, message = "Name is too long"))]
    pub full_name: String,
    #[serde(default)]
    #[validate(custom(function = "non_negative_number"))]
    pub height: String,
    #[serde(default)]
    #[validate(custom(function = "optional_date"))]
    pub date_of_birth: String,
    #[serde(default)]
    #[validate(custom(function = "non_negative_number"))]
    pub weight: String,
}

impl ProfileForm {
    pub fn into_update(self) -> ProfileUpdate {
        ProfileUpdate {
            full_name: non_empty(self.full_name),
            height: parse_number(&self.height),
            weight: parse_number(&self.weight),
            date_of_birth: parse_date(&self.date_of_birth),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct GoalForm {
    /// Accepted for compatibility with older clients and ignored.
    #[serde(default)]
    pub user_id: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Goal title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "required_date"))]
    pub start_date: String,
    #[serde(default)]
    #[validate(custom(function = "optional_date"))]
    pub target_date: String,
    #[validate(length(min = 1, message = "Goal type is required"))]
    pub goal_type: String,
    #[serde(default)]
    #[validate(custom(function = "non_negative_number"))]
    pub target_value: String,
    #[serde(default)]
    #[validate(custom(function = "non_negative_number"))]
    pub current_value: String,
    #[serde(default)]
    pub unit: String,
}

impl GoalForm {
    pub fn into_new_goal(self) -> Result<NewGoal, AppError> {
        let start_date = parse_date(&self.start_date)
            .ok_or_else(|| AppError::BadRequest("Start date is required".to_string()))?;
        Ok(NewGoal {
            user_id: self.user_id.and_then(|id| Uuid::parse_str(&id).ok()),
            title: self.title.trim().to_string(),
            description: non_empty(self.description),
            start_date,
            target_date: parse_date(&self.target_date),
            goal_type: self.goal_type,
            target_value: parse_number(&self.target_value),
            current_value: parse_number(&self.current_value),
            unit: non_empty(self.unit),
        })
    }
}

/// Progress update or completion toggle for an existing goal.
#[derive(Debug, Deserialize, Validate)]
pub struct GoalUpdateForm {
    #[serde(default)]
    pub completed: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "non_negative_number"))]
    pub current_value: String,
}

impl GoalUpdateForm {
    pub fn into_update(self) -> GoalUpdate {
        GoalUpdate {
            completed: self.completed.as_deref().map(|v| v == "true" || v == "on"),
            current_value: parse_number(&self.current_value),
            ..Default::default()
        }
    }
}

/// First validation message, by field name, for display above a form.
pub fn first_message(errors: &ValidationErrors) -> String {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().collect();
    fields.sort();
    fields
        .into_iter()
        .flat_map(|field| field_errors[field].iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input".to_string())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse().ok()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn non_negative_number(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    match parse_number(value) {
        Some(number) if number.is_finite() && number >= 0.0 => Ok(()),
        _ => Err(invalid(
            "non_negative",
            "Values must be non-negative numbers",
        )),
    }
}

fn optional_date(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || parse_date(value).is_some() {
        Ok(())
    } else {
        Err(invalid("date", "Dates must use the YYYY-MM-DD format"))
    }
}

fn required_date(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("required", "Start date is required"));
    }
    optional_date(value)
}
