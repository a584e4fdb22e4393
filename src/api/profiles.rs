use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    api::parse_id,
    errors::{AppError, FieldErrors},
    models::{
        app_state::AppState,
        profile::{Profile, ProfilePayload},
    },
    store::Store,
    utils::validation,
};

#[derive(Debug, Default)]
struct ProfileChanges {
    user: Option<Uuid>,
    bio: Option<String>,
    profile_picture_url: Option<String>,
    social_links: Option<Map<String, Value>>,
}

impl ProfileChanges {
    fn apply(self, profile: &mut Profile) {
        if let Some(user) = self.user {
            profile.user = user;
        }
        if let Some(bio) = self.bio {
            profile.bio = bio;
        }
        if let Some(url) = self.profile_picture_url {
            profile.profile_picture_url = url;
        }
        if let Some(links) = self.social_links {
            profile.social_links = links;
        }
    }
}

/// The referenced user must exist and must not own a profile other than `current`
async fn validate_owner(
    store: &dyn Store,
    value: &Value,
    current: Option<Uuid>,
) -> Result<Result<Uuid, validator::ValidationError>, AppError> {
    let user_id = match validation::parse_user_ref(value) {
        Ok(id) => id,
        Err(e) => return Ok(Err(e)),
    };
    if store.get_user(user_id).await?.is_none() {
        return Ok(Err(validation::missing_user(&user_id.to_string())));
    }
    let owned_elsewhere = store
        .profile_for_user(user_id)
        .await?
        .is_some_and(|p| Some(p.id) != current);
    if owned_elsewhere {
        return Ok(Err(validation::profile_exists()));
    }
    Ok(Ok(user_id))
}

async fn validate_profile(
    store: &dyn Store,
    payload: &ProfilePayload,
    current: Option<Uuid>,
    partial: bool,
) -> Result<ProfileChanges, AppError> {
    let mut errors = FieldErrors::new();
    let mut changes = ProfileChanges::default();

    match &payload.user {
        Some(value) => match validate_owner(store, value, current).await? {
            Ok(user) => changes.user = Some(user),
            Err(e) => errors.add("user", e),
        },
        None if !partial => errors.add("user", validation::required()),
        None => {}
    }

    if let Some(bio) = &payload.bio {
        match validation::text(bio) {
            Ok(bio) => changes.bio = Some(bio.to_string()),
            Err(e) => errors.add("bio", e),
        }
    }

    if let Some(url) = &payload.profile_picture_url {
        match validation::validate_profile_picture_url(url) {
            Ok(url) => changes.profile_picture_url = Some(url),
            Err(e) => errors.add("profile_picture_url", e),
        }
    }

    if let Some(links) = &payload.social_links {
        match validation::validate_social_links(links) {
            Ok(links) => changes.social_links = Some(links),
            Err(e) => errors.add("social_links", e),
        }
    }

    errors.into_result()?;
    Ok(changes)
}

async fn find_profile(state: &AppState, raw_id: &str) -> Result<Profile, AppError> {
    let id = parse_id(raw_id).ok_or(AppError::ProfileNotFound)?;
    state
        .store
        .get_profile(id)
        .await?
        .ok_or(AppError::ProfileNotFound)
}

/// List all profiles
#[utoipa::path(
    get,
    path = "/api/profiles/",
    responses(
        (status = 200, description = "All profiles", body = [Profile]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Profiles"
)]
pub async fn list_profiles(State(state): State<AppState>) -> Result<Json<Vec<Profile>>, AppError> {
    Ok(Json(state.store.list_profiles().await?))
}

/// Create a profile for a user
#[utoipa::path(
    post,
    path = "/api/profiles/",
    request_body = ProfilePayload,
    responses(
        (status = 201, description = "Profile created", body = Profile),
        (status = 400, description = "Validation failed, body maps field to messages"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Profiles"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    let Json(payload) = payload?;
    let changes = validate_profile(state.store.as_ref(), &payload, None, false).await?;
    let Some(user) = changes.user else {
        return Err(FieldErrors::single("user", validation::required()).into());
    };

    let mut profile = Profile {
        id: Uuid::new_v4(),
        user,
        bio: String::new(),
        profile_picture_url: String::new(),
        social_links: Map::new(),
    };
    changes.apply(&mut profile);

    let profile = state.store.insert_profile(&profile).await?;
    tracing::info!("Created profile {} for user {}", profile.id, profile.user);

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Get a single profile
#[utoipa::path(
    get,
    path = "/api/profiles/{id}/",
    params(("id" = Uuid, Path, description = "Profile id")),
    responses(
        (status = 200, description = "The profile", body = Profile),
        (status = 404, description = "Profile not found")
    ),
    tag = "Profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(find_profile(&state, &id).await?))
}

async fn update_profile(
    state: AppState,
    id: String,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
    partial: bool,
) -> Result<Json<Profile>, AppError> {
    let mut profile = find_profile(&state, &id).await?;
    let Json(payload) = payload?;

    let changes =
        validate_profile(state.store.as_ref(), &payload, Some(profile.id), partial).await?;
    changes.apply(&mut profile);

    let profile = state
        .store
        .update_profile(&profile)
        .await?
        .ok_or(AppError::ProfileNotFound)?;
    tracing::info!("Updated profile {}", profile.id);

    Ok(Json(profile))
}

/// Replace a profile; `user` is required
#[utoipa::path(
    put,
    path = "/api/profiles/{id}/",
    params(("id" = Uuid, Path, description = "Profile id")),
    request_body = ProfilePayload,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Profile not found")
    ),
    tag = "Profiles"
)]
pub async fn replace_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> Result<Json<Profile>, AppError> {
    update_profile(state, id, payload, false).await
}

/// Update only the supplied fields of a profile
#[utoipa::path(
    patch,
    path = "/api/profiles/{id}/",
    params(("id" = Uuid, Path, description = "Profile id")),
    request_body = ProfilePayload,
    responses(
        (status = 200, description = "Profile updated", body = Profile),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Profile not found")
    ),
    tag = "Profiles"
)]
pub async fn patch_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> Result<Json<Profile>, AppError> {
    update_profile(state, id, payload, true).await
}

/// Delete a profile
#[utoipa::path(
    delete,
    path = "/api/profiles/{id}/",
    params(("id" = Uuid, Path, description = "Profile id")),
    responses(
        (status = 204, description = "Profile deleted"),
        (status = 404, description = "Profile not found")
    ),
    tag = "Profiles"
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id).ok_or(AppError::ProfileNotFound)?;
    if !state.store.delete_profile(id).await? {
        return Err(AppError::ProfileNotFound);
    }
    tracing::info!("Deleted profile {}", id);

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::api::testing::TestApp;

    async fn user_id(app: &TestApp, email: &str) -> String {
        let (status, user) = app
            .post("/api/users/", json!({"name": "Owner", "email": email}))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{user}");
        user["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_fills_defaults() {
        let app = TestApp::new();
        let owner = user_id(&app, "owner@example.com").await;

        let (status, profile) = app.post("/api/profiles/", json!({"user": owner})).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(profile["user"], owner);
        assert_eq!(profile["bio"], "");
        assert_eq!(profile["profile_picture_url"], "");
        assert_eq!(profile["social_links"], json!({}));
    }

    #[tokio::test]
    async fn non_http_picture_url_is_rejected() {
        let app = TestApp::new();
        let owner = user_id(&app, "pic@example.com").await;

        let (status, body) = app
            .post(
                "/api/profiles/",
                json!({"user": owner, "profile_picture_url": "ftp://x"}),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"profile_picture_url": ["Profile picture URL must start with http:// or https://"]})
        );

        let (_, profiles) = app.get("/api/profiles/").await;
        assert_eq!(profiles, json!([]));
    }

    #[tokio::test]
    async fn wrong_types_are_reported_per_field() {
        let app = TestApp::new();
        let owner = user_id(&app, "types@example.com").await;

        let (status, body) = app
            .post(
                "/api/profiles/",
                json!({
                    "user": owner,
                    "bio": 42,
                    "profile_picture_url": "ftp://x",
                    "social_links": "gh",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "bio": ["Not a valid string."],
                "profile_picture_url": ["Profile picture URL must start with http:// or https://"],
                "social_links": ["Expected a dictionary of items but got type \"str\"."],
            })
        );
    }

    #[tokio::test]
    async fn owner_must_exist() {
        let app = TestApp::new();
        let ghost = uuid::Uuid::new_v4().to_string();

        let (status, body) = app.post("/api/profiles/", json!({"user": ghost})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["user"],
            json!([format!("Invalid pk \"{ghost}\" - object does not exist.")])
        );

        let (status, body) = app.post("/api/profiles/", json!({"bio": "x"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"user": ["This field is required."]}));
    }

    #[tokio::test]
    async fn one_profile_per_user() {
        let app = TestApp::new();
        let owner = user_id(&app, "once@example.com").await;
        let (status, _) = app.post("/api/profiles/", json!({"user": owner})).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app.post("/api/profiles/", json!({"user": owner})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({"user": ["profile with this user already exists."]})
        );
    }

    #[tokio::test]
    async fn patch_and_put() {
        let app = TestApp::new();
        let owner = user_id(&app, "edit@example.com").await;
        let (_, profile) = app
            .post(
                "/api/profiles/",
                json!({"user": owner, "bio": "old", "social_links": {"x": "@old"}}),
            )
            .await;
        let uri = format!("/api/profiles/{}/", profile["id"].as_str().unwrap());

        let (status, patched) = app
            .patch(&uri, json!({"profile_picture_url": "https://img.example.com/me.png"}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["bio"], "old");
        assert_eq!(patched["profile_picture_url"], "https://img.example.com/me.png");
        assert_eq!(patched["social_links"], json!({"x": "@old"}));

        let (status, body) = app.put(&uri, json!({"bio": "new"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"user": ["This field is required."]}));

        // keeping the same owner is not a uniqueness conflict
        let (status, replaced) = app
            .put(&uri, json!({"user": owner, "bio": "new", "social_links": {"gh": 1}}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced["bio"], "new");
        assert_eq!(replaced["social_links"], json!({"gh": 1}));
    }

    #[tokio::test]
    async fn retrieve_and_delete() {
        let app = TestApp::new();
        let owner = user_id(&app, "gone@example.com").await;
        let (_, profile) = app.post("/api/profiles/", json!({"user": owner})).await;
        let uri = format!("/api/profiles/{}/", profile["id"].as_str().unwrap());

        let (status, fetched) = app.get(&uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, profile);

        let (status, body) = app.delete(&uri).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = app.get(&uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Profile not found"}));

        // the owner survives
        let (_, user) = app.get(&format!("/api/users/{owner}/")).await;
        assert_eq!(user["profile"], Value::Null);
    }
}
