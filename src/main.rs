mod api;
mod config;
mod errors;
mod models;
mod store;
mod utils;

use axum::{Json, Router, extract::State, routing::get};
use serde_json::{Value, json};
use shuttle_axum::ShuttleAxum;
use shuttle_runtime::{CustomError, SecretStore};
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    api_root,
    profiles::{
        create_profile, delete_profile, get_profile, list_profiles, patch_profile,
        replace_profile,
    },
    users::{check_email, create_user, delete_user, get_user, list_users, patch_user, replace_user},
};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::app_state::AppState;
use crate::store::PgStore;

/// API Documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::users::list_users,
        crate::api::users::create_user,
        crate::api::users::get_user,
        crate::api::users::replace_user,
        crate::api::users::patch_user,
        crate::api::users::delete_user,
        crate::api::users::check_email,
        crate::api::profiles::list_profiles,
        crate::api::profiles::create_profile,
        crate::api::profiles::get_profile,
        crate::api::profiles::replace_profile,
        crate::api::profiles::patch_profile,
        crate::api::profiles::delete_profile,
    ),
    components(
        schemas(
            crate::models::user::UserResponse,
            crate::models::user::UserPayload,
            crate::models::user::EmailAvailability,
            crate::models::profile::Profile,
            crate::models::profile::ProfilePayload,
        )
    ),
    tags(
        (name = "Users", description = "User records and email availability"),
        (name = "Profiles", description = "One optional profile per user")
    ),
    info(
        title = "User Profiles API",
        version = "0.1.0",
        description = "CRUD API for users and their profiles"
    )
)]
struct ApiDoc;

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    health_report(state.store.ping().await)
}

fn health_report(ping: Result<(), AppError>) -> Json<Value> {
    match ping {
        Ok(()) => Json(json!({
            "status": "healthy",
            "database": "connected"
        })),
        Err(e) => {
            tracing::error!("Health check failed: {:?}", e);
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "error": "Database unreachable"
            }))
        }
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/", get(api_root))
        .route("/api/health", get(health_check))
        // Users
        .route("/api/users/", get(list_users).post(create_user))
        .route("/api/users/validate_email/", get(check_email))
        .route(
            "/api/users/{id}/",
            get(get_user)
                .put(replace_user)
                .patch(patch_user)
                .delete(delete_user),
        )
        // Profiles
        .route("/api/profiles/", get(list_profiles).post(create_profile))
        .route(
            "/api/profiles/{id}/",
            get(get_profile)
                .put(replace_profile)
                .patch(patch_profile)
                .delete(delete_profile),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[shuttle_runtime::main]
async fn main(
    #[shuttle_shared_db::Postgres] conn_str: String,
    #[shuttle_runtime::Secrets] secrets: SecretStore,
) -> ShuttleAxum {
    let config = AppConfig::from_secrets(&secrets);

    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&conn_str)
        .await
        .map_err(CustomError::new)?;

    let store = PgStore::new(db);
    if config.run_migrations {
        store.migrate().await.map_err(CustomError::new)?;
        tracing::info!("Database migrations applied");
    }

    Ok(app(AppState::new(store)).into())
}
