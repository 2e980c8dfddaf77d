//! Profile model stored in the `profiles` table.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User profile (one row per user, `id` equals the user ID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Height in centimeters
    #[serde(default)]
    pub height: Option<f64>,
    /// Weight in kilograms
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

/// Full-record profile update.
///
/// Every field is written, so `None` clears the stored value. The row ID and
/// timestamps are not part of the update; the access layer scopes and stamps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub date_of_birth: Option<NaiveDate>,
}
