//! Persistence behind the handlers.
//!
//! `PgStore` is what the service runs on. The in-memory store mirrors the
//! database constraints (unique email, one profile per user, cascade delete)
//! and backs the handler tests.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    errors::AppError,
    models::{profile::Profile, user::User},
};

pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Connectivity check for the health endpoint
    async fn ping(&self) -> Result<(), AppError>;

    /// All users, newest first
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    /// Case-insensitive lookup, optionally ignoring one user
    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, AppError>;
    async fn insert_user(&self, user: &User) -> Result<User, AppError>;
    /// Writes everything but `created_at`; `None` when the row is gone
    async fn update_user(&self, user: &User) -> Result<Option<User>, AppError>;
    /// Also removes the user's profile
    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError>;

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError>;
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError>;
    async fn profile_for_user(&self, user_id: Uuid) -> Result<Option<Profile>, AppError>;
    async fn profiles_for_users(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, AppError>;
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, AppError>;
    async fn update_profile(&self, profile: &Profile) -> Result<Option<Profile>, AppError>;
    async fn delete_profile(&self, id: Uuid) -> Result<bool, AppError>;
}
