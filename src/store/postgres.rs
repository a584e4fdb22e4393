use async_trait::async_trait;
use sqlx::{PgPool, migrate::MigrateError, types::Json};
use uuid::Uuid;

use super::Store;
use crate::{
    errors::{AppError, FieldErrors},
    models::{profile::Profile, user::User},
    utils::validation,
};

/// Store backed by the shared Postgres database
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply the embedded migrations
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(&self.db).await
    }
}

/// Turn a unique-constraint violation from a racing write into the field
/// error the pre-check would have reported.
fn conflict_or_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_email_key") => {
                    return FieldErrors::single("email", validation::email_taken()).into();
                }
                Some("profiles_user_id_key") => {
                    return FieldErrors::single("user", validation::profile_exists()).into();
                }
                _ => {}
            }
        }
    }
    AppError::DatabaseError(e)
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1 as health_check")
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, age, created_at, updated_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, age, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1)
                AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(&self.db)
        .await?;

        Ok(taken)
    }

    async fn insert_user(&self, user: &User) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, age, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, age, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.age)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.db)
        .await
        .map_err(conflict_or_db_error)
    }

    async fn update_user(&self, user: &User) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $1, email = $2, age = $3, updated_at = $4
            WHERE id = $5
            RETURNING id, name, email, age, created_at, updated_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.age)
        .bind(user.updated_at)
        .bind(user.id)
        .fetch_optional(&self.db)
        .await
        .map_err(conflict_or_db_error)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        // profiles.user_id is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, user_id, bio, profile_picture_url, social_links
            FROM profiles
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(profiles)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, user_id, bio, profile_picture_url, social_links FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    async fn profile_for_user(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT id, user_id, bio, profile_picture_url, social_links FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    async fn profiles_for_users(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, AppError> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, user_id, bio, profile_picture_url, social_links
            FROM profiles
            WHERE user_id = ANY($1)
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(profiles)
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, AppError> {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, user_id, bio, profile_picture_url, social_links)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, bio, profile_picture_url, social_links
            "#,
        )
        .bind(profile.id)
        .bind(profile.user)
        .bind(&profile.bio)
        .bind(&profile.profile_picture_url)
        .bind(Json(&profile.social_links))
        .fetch_one(&self.db)
        .await
        .map_err(conflict_or_db_error)
    }

    async fn update_profile(&self, profile: &Profile) -> Result<Option<Profile>, AppError> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET user_id = $1, bio = $2, profile_picture_url = $3, social_links = $4
            WHERE id = $5
            RETURNING id, user_id, bio, profile_picture_url, social_links
            "#,
        )
        .bind(profile.user)
        .bind(&profile.bio)
        .bind(&profile.profile_picture_url)
        .bind(Json(&profile.social_links))
        .bind(profile.id)
        .fetch_optional(&self.db)
        .await
        .map_err(conflict_or_db_error)
    }

    async fn delete_profile(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
