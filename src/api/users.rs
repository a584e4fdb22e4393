use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    api::parse_id,
    errors::{AppError, FieldErrors},
    models::{
        app_state::AppState,
        profile::Profile,
        user::{EmailAvailability, EmailQuery, User, UserPayload, UserResponse},
    },
    store::Store,
    utils::validation,
};

/// Validated, normalized fields of a [`UserPayload`]
#[derive(Debug, Default)]
struct UserChanges {
    name: Option<String>,
    email: Option<String>,
    age: Option<Option<i32>>,
}

impl UserChanges {
    fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(age) = self.age {
            user.age = age;
        }
    }
}

/// Run every field check and report all failures together.
///
/// With `partial` unset, `name` and `email` must be present.
async fn validate_user(
    store: &dyn Store,
    payload: &UserPayload,
    current: Option<Uuid>,
    partial: bool,
) -> Result<UserChanges, AppError> {
    let mut errors = FieldErrors::new();
    let mut changes = UserChanges::default();

    match &payload.name {
        Some(name) => match validation::validate_name(name) {
            Ok(name) => changes.name = Some(name),
            Err(e) => errors.add("name", e),
        },
        None if !partial => errors.add("name", validation::required()),
        None => {}
    }

    match &payload.email {
        Some(email) => match validation::validate_email(store, email, current).await? {
            Ok(email) => changes.email = Some(email),
            Err(e) => errors.add("email", e),
        },
        None if !partial => errors.add("email", validation::required()),
        None => {}
    }

    if let Some(age) = &payload.age {
        match validation::validate_age(age.as_ref()) {
            Ok(age) => changes.age = Some(age),
            Err(e) => errors.add("age", e),
        }
    }

    errors.into_result()?;
    Ok(changes)
}

async fn with_profile(state: &AppState, user: User) -> Result<UserResponse, AppError> {
    let profile = state.store.profile_for_user(user.id).await?;
    Ok(UserResponse::new(user, profile))
}

async fn find_user(state: &AppState, raw_id: &str) -> Result<User, AppError> {
    let id = parse_id(raw_id).ok_or(AppError::UserNotFound)?;
    state
        .store
        .get_user(id)
        .await?
        .ok_or(AppError::UserNotFound)
}

/// List all users, newest first
#[utoipa::path(
    get,
    path = "/api/users/",
    responses(
        (status = 200, description = "All users with their profiles", body = [UserResponse]),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.store.list_users().await?;

    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let mut profiles: HashMap<Uuid, Profile> = state
        .store
        .profiles_for_users(&ids)
        .await?
        .into_iter()
        .map(|p| (p.user, p))
        .collect();

    let users = users
        .into_iter()
        .map(|user| {
            let profile = profiles.remove(&user.id);
            UserResponse::new(user, profile)
        })
        .collect();

    Ok(Json(users))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/users/",
    request_body = UserPayload,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed, body maps field to messages"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let Json(payload) = payload?;
    let changes = validate_user(state.store.as_ref(), &payload, None, false).await?;

    let now = Utc::now();
    let mut user = User {
        id: Uuid::new_v4(),
        name: String::new(),
        email: String::new(),
        age: None,
        created_at: now,
        updated_at: now,
    };
    changes.apply(&mut user);

    let user = state.store.insert_user(&user).await?;
    tracing::info!("Created user {} <{}>", user.id, user.email);

    Ok((StatusCode::CREATED, Json(UserResponse::new(user, None))))
}

/// Get a single user
#[utoipa::path(
    get,
    path = "/api/users/{id}/",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = find_user(&state, &id).await?;
    Ok(Json(with_profile(&state, user).await?))
}

async fn update_user(
    state: AppState,
    id: String,
    payload: Result<Json<UserPayload>, JsonRejection>,
    partial: bool,
) -> Result<Json<UserResponse>, AppError> {
    let mut user = find_user(&state, &id).await?;
    let Json(payload) = payload?;

    let changes = validate_user(state.store.as_ref(), &payload, Some(user.id), partial).await?;
    changes.apply(&mut user);
    user.updated_at = Utc::now();

    let user = state
        .store
        .update_user(&user)
        .await?
        .ok_or(AppError::UserNotFound)?;
    tracing::info!("Updated user {}", user.id);

    Ok(Json(with_profile(&state, user).await?))
}

/// Replace a user; `name` and `email` are required
#[utoipa::path(
    put,
    path = "/api/users/{id}/",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserPayload,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn replace_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    update_user(state, id, payload, false).await
}

/// Update only the supplied fields of a user
#[utoipa::path(
    patch,
    path = "/api/users/{id}/",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserPayload,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn patch_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    update_user(state, id, payload, true).await
}

/// Delete a user and its profile
#[utoipa::path(
    delete,
    path = "/api/users/{id}/",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id).ok_or(AppError::UserNotFound)?;
    if !state.store.delete_user(id).await? {
        return Err(AppError::UserNotFound);
    }
    tracing::info!("Deleted user {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Check whether an email is still free
#[utoipa::path(
    get,
    path = "/api/users/validate_email/",
    params(EmailQuery),
    responses(
        (status = 200, description = "Availability of the email", body = EmailAvailability),
        (status = 400, description = "Email parameter is required")
    ),
    tag = "Users"
)]
pub async fn check_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<EmailAvailability>, AppError> {
    let email = query
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email parameter is required".to_string()))?;

    let taken = state.store.email_taken(&email, None).await?;

    Ok(Json(EmailAvailability {
        email,
        available: !taken,
    }))
}
