use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::auth::repo_types::{NewUser, User, UserRow};
use crate::recipes::repo_types::{NewRecipe, Recipe};
use crate::validation::Validated;

#[derive(Default)]
struct Tables {
    users: Vec<UserRow>,
    recipes: Vec<Recipe>,
    /// session id -> (owner, expires_at)
    sessions: HashMap<Uuid, (Uuid, OffsetDateTime)>,
}

impl Tables {
    fn insert_user(&mut self, user: &Validated<NewUser>) -> StoreResult<UserRow> {
        let password_hash = user
            .credential()
            .stored()
            .context("validated user has no password hash")?
            .to_owned();

        if self.users.iter().any(|u| u.username == user.username()) {
            return Err(StoreError::UniqueViolation);
        }
        let row = UserRow {
            id: Uuid::new_v4(),
            username: user.username().to_owned(),
            password_hash,
            image_url: user.image_url.clone(),
            bio: user.bio.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.push(row.clone());
        Ok(row)
    }

    fn open_session(&mut self, user_id: Uuid, expires_at: OffsetDateTime) -> StoreResult<Uuid> {
        if !self.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::MissingOwner);
        }
        let now = OffsetDateTime::now_utc();
        self.sessions.retain(|_, (_, expires)| *expires > now);

        let session_id = Uuid::new_v4();
        self.sessions.insert(session_id, (user_id, expires_at));
        Ok(session_id)
    }
}

/// In-process store used by tests and `AppState::fake`.
///
/// One lock guards all tables, so check-and-insert is atomic like a unique index.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn counts(&self) -> (usize, usize) {
        let t = self.tables.lock().await;
        (t.users.len(), t.sessions.len())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: Validated<NewUser>) -> StoreResult<User> {
        let row = self.tables.lock().await.insert_user(&user)?;
        Ok(row.into())
    }

    async fn insert_user_with_session(
        &self,
        user: Validated<NewUser>,
        expires_at: OffsetDateTime,
    ) -> StoreResult<(User, Uuid)> {
        let mut t = self.tables.lock().await;
        let row = t.insert_user(&user)?;
        match t.open_session(row.id, expires_at) {
            Ok(session_id) => Ok((row.into(), session_id)),
            Err(e) => {
                t.users.retain(|u| u.id != row.id);
                Err(e)
            }
        }
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .map(User::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned().map(User::from))
    }

    async fn insert_recipe(&self, recipe: Validated<NewRecipe>) -> StoreResult<Recipe> {
        let mut t = self.tables.lock().await;
        if !t.users.iter().any(|u| u.id == recipe.user_id) {
            return Err(StoreError::MissingOwner);
        }
        let row = Recipe {
            id: Uuid::new_v4(),
            user_id: recipe.user_id,
            title: recipe.title().to_owned(),
            instructions: recipe.instructions().to_owned(),
            minutes_to_complete: recipe.minutes(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.recipes.push(row.clone());
        Ok(row)
    }

    async fn list_recipes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>> {
        let t = self.tables.lock().await;
        Ok(t.recipes
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_session(&self, user_id: Uuid, expires_at: OffsetDateTime) -> StoreResult<Uuid> {
        self.tables.lock().await.open_session(user_id, expires_at)
    }

    async fn session_owner(&self, session_id: Uuid) -> StoreResult<Option<Uuid>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .tables
            .lock()
            .await
            .sessions
            .get(&session_id)
            .filter(|(_, expires)| *expires > now)
            .map(|(owner, _)| *owner))
    }

    async fn delete_session(&self, session_id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.lock().await.sessions.remove(&session_id).is_some())
    }
}
