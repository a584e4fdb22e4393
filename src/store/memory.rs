use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::{
    errors::{AppError, FieldErrors},
    models::{profile::Profile, user::User},
    utils::validation,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
}

impl Tables {
    fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| Some(u.id) != exclude && u.email.eq_ignore_ascii_case(email))
    }

    fn has_profile(&self, user_id: Uuid, exclude: Option<Uuid>) -> bool {
        self.profiles
            .values()
            .any(|p| Some(p.id) != exclude && p.user == user_id)
    }
}

/// In-process store with the same constraints as the Postgres schema
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.tables.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn email_taken(&self, email: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        Ok(self.tables.read().await.email_taken(email, exclude))
    }

    async fn insert_user(&self, user: &User) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(FieldErrors::single("email", validation::email_taken()).into());
        }
        tables.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, user: &User) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, Some(user.id)) {
            return Err(FieldErrors::single("email", validation::email_taken()).into());
        }
        let Some(stored) = tables.users.get_mut(&user.id) else {
            return Ok(None);
        };
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.age = user.age;
        stored.updated_at = user.updated_at;
        Ok(Some(stored.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.profiles.retain(|_, p| p.user != id);
        Ok(true)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let mut profiles: Vec<Profile> = self
            .tables
            .read()
            .await
            .profiles
            .values()
            .cloned()
            .collect();
        profiles.sort_by_key(|p| p.id);
        Ok(profiles)
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn profile_for_user(&self, user_id: Uuid) -> Result<Option<Profile>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .values()
            .find(|p| p.user == user_id)
            .cloned())
    }

    async fn profiles_for_users(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .profiles
            .values()
            .filter(|p| user_ids.contains(&p.user))
            .cloned()
            .collect())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, AppError> {
        let mut tables = self.tables.write().await;
        if tables.has_profile(profile.user, None) {
            return Err(FieldErrors::single("user", validation::profile_exists()).into());
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile.clone())
    }

    async fn update_profile(&self, profile: &Profile) -> Result<Option<Profile>, AppError> {
        let mut tables = self.tables.write().await;
        if tables.has_profile(profile.user, Some(profile.id)) {
            return Err(FieldErrors::single("user", validation::profile_exists()).into());
        }
        let Some(stored) = tables.profiles.get_mut(&profile.id) else {
            return Ok(None);
        };
        *stored = profile.clone();
        Ok(Some(stored.clone()))
    }

    async fn delete_profile(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.tables.write().await.profiles.remove(&id).is_some())
    }
}
