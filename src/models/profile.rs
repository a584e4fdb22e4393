use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User profile
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, ToSchema)]
pub struct Profile {
    pub id: Uuid,
    /// Owning user
    #[sqlx(rename = "user_id")]
    pub user: Uuid,
    pub bio: String,
    #[schema(example = "https://example.com/avatar.jpg")]
    pub profile_picture_url: String,
    #[sqlx(json)]
    #[schema(value_type = Object)]
    pub social_links: Map<String, Value>,
}

/// Create or update a profile
///
/// `user` is required on POST and PUT.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProfilePayload {
    /// Id of the owning user
    #[schema(value_type = Option<String>, format = Uuid)]
    pub user: Option<Value>,

    #[schema(value_type = Option<String>, example = "Coffee, maps and long walks.")]
    pub bio: Option<Value>,

    /// Empty, or an http(s) URL
    #[schema(value_type = Option<String>, example = "https://example.com/avatar.jpg")]
    pub profile_picture_url: Option<Value>,

    /// Arbitrary key/value links
    #[schema(value_type = Option<Object>)]
    pub social_links: Option<Value>,
}
