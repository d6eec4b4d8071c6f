mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::recipes::repo_types::{NewRecipe, Recipe};
use crate::validation::Validated;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the row (duplicate username).
    #[error("unique constraint violated")]
    UniqueViolation,
    /// The owning user row does not exist.
    #[error("owner does not exist")]
    MissingOwner,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for users, recipes and login sessions.
///
/// Writes accept only validated drafts. Each write is its own transaction.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: Validated<NewUser>) -> StoreResult<User>;
    /// Inserts the user and its first session together; neither row exists unless both do.
    async fn insert_user_with_session(
        &self,
        user: Validated<NewUser>,
        expires_at: OffsetDateTime,
    ) -> StoreResult<(User, Uuid)>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_recipe(&self, recipe: Validated<NewRecipe>) -> StoreResult<Recipe>;
    async fn list_recipes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>>;

    /// Opens a session until `expires_at`, dropping sessions that have already expired.
    async fn create_session(&self, user_id: Uuid, expires_at: OffsetDateTime) -> StoreResult<Uuid>;
    /// Owner of a live, unexpired session, if any.
    async fn session_owner(&self, session_id: Uuid) -> StoreResult<Option<Uuid>>;
    /// Returns false when the session was already gone.
    async fn delete_session(&self, session_id: Uuid) -> StoreResult<bool>;
}
