use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::profile::Profile;

/// User from database
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User with its profile nested
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    /// Unique user identifier
    pub id: Uuid,
    #[schema(example = "Al")]
    pub name: String,
    /// Always stored lower-cased
    #[schema(example = "al@example.com")]
    pub email: String,
    #[schema(example = 30)]
    pub age: Option<i32>,
    /// Attached profile, `null` when the user has none
    pub profile: Option<Profile>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn new(user: User, profile: Option<Profile>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            age: user.age,
            profile,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Create or update a user
///
/// `name` and `email` are required on POST and PUT. PATCH accepts any subset.
/// Fields stay raw JSON so a wrong type is reported against its own field.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserPayload {
    /// Display name (2-100 characters after trimming)
    #[schema(value_type = Option<String>, example = "Al")]
    pub name: Option<Value>,

    /// Email address, unique regardless of case
    #[schema(value_type = Option<String>, example = "AL@Example.com")]
    pub email: Option<Value>,

    /// Age between 1 and 120, `null` to clear
    #[serde(default, deserialize_with = "super::present")]
    #[schema(value_type = Option<i32>, example = 30)]
    pub age: Option<Option<Value>>,
}

/// Email availability query
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailQuery {
    /// Email address to look up
    pub email: Option<String>,
}

/// Email availability result
#[derive(Debug, Serialize, ToSchema)]
pub struct EmailAvailability {
    /// The email as supplied
    #[schema(example = "al@example.com")]
    pub email: String,
    /// Whether no user holds this email yet
    pub available: bool,
}
