pub mod profiles;
pub mod users;

use axum::Json;
use serde_json::{Value, json};
use uuid::Uuid;

/// Ids that don't parse can't exist, so callers answer 404 rather than 400.
pub(crate) fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

/// Links to every collection
pub async fn api_root() -> Json<Value> {
    Json(json!({
        "users": "/api/users/",
        "profiles": "/api/profiles/",
    }))
}
