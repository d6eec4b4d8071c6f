use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::auth::repo_types::{NewUser, User, UserRow};
use crate::recipes::repo_types::{NewRecipe, Recipe};
use crate::validation::Validated;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Maps constraint failures to their typed variants; anything else is opaque.
fn write_error(e: sqlx::Error, what: &'static str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation;
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::MissingOwner;
        }
    }
    StoreError::Other(anyhow::Error::new(e).context(what))
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: Validated<NewUser>) -> StoreResult<User> {
        // Dropping `tx` without commit rolls the insert back.
        let mut tx = self.db.begin().await.context("begin tx")?;
        let row = insert_user_row(&mut *tx, &user).await?;
        tx.commit().await.context("commit tx")?;

        debug!(user_id = %row.id, "user row inserted");
        Ok(row.into())
    }

    async fn insert_user_with_session(
        &self,
        user: Validated<NewUser>,
        expires_at: OffsetDateTime,
    ) -> StoreResult<(User, Uuid)> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let row = insert_user_row(&mut *tx, &user).await?;
        let session_id = insert_session_row(&mut *tx, row.id, expires_at).await?;
        tx.commit().await.context("commit tx")?;

        debug!(user_id = %row.id, "user row inserted with session");
        Ok((row.into(), session_id))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, image_url, bio, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .context("find user by username")?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, image_url, bio, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(row.map(User::from))
    }

    async fn insert_recipe(&self, recipe: Validated<NewRecipe>) -> StoreResult<Recipe> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let row = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (id, user_id, title, instructions, minutes_to_complete)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, instructions, minutes_to_complete, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(recipe.user_id)
        .bind(recipe.title())
        .bind(recipe.instructions())
        .bind(recipe.minutes())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, "insert recipe"))?;
        tx.commit().await.context("commit tx")?;
        Ok(row)
    }

    async fn list_recipes_by_user(&self, user_id: Uuid) -> StoreResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, title, instructions, minutes_to_complete, created_at
            FROM recipes
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list recipes by user")?;
        Ok(rows)
    }

    async fn create_session(&self, user_id: Uuid, expires_at: OffsetDateTime) -> StoreResult<Uuid> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let session_id = insert_session_row(&mut *tx, user_id, expires_at).await?;
        tx.commit().await.context("commit tx")?;
        Ok(session_id)
    }

    async fn session_owner(&self, session_id: Uuid) -> StoreResult<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Uuid>(
            r#"SELECT user_id FROM sessions WHERE id = $1 AND expires_at > now()"#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await
        .context("find session")?;
        Ok(owner)
    }

    async fn delete_session(&self, session_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(r#"DELETE FROM sessions WHERE id = $1"#)
            .bind(session_id)
            .execute(&self.db)
            .await
            .context("delete session")?;
        Ok(result.rows_affected() > 0)
    }
}

async fn insert_user_row(conn: &mut PgConnection, user: &Validated<NewUser>) -> StoreResult<UserRow> {
    let password_hash = user
        .credential()
        .stored()
        .context("validated user has no password hash")?;

    let row = sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, username, password_hash, image_url, bio)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, password_hash, image_url, bio, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.username())
    .bind(password_hash)
    .bind(user.image_url.as_deref())
    .bind(user.bio.as_deref())
    .fetch_one(conn)
    .await
    .map_err(|e| write_error(e, "insert user"))?;
    Ok(row)
}

/// Prunes expired sessions, then opens a new one.
async fn insert_session_row(
    conn: &mut PgConnection,
    user_id: Uuid,
    expires_at: OffsetDateTime,
) -> StoreResult<Uuid> {
    let pruned = sqlx::query(r#"DELETE FROM sessions WHERE expires_at <= now()"#)
        .execute(&mut *conn)
        .await
        .context("prune sessions")?;
    if pruned.rows_affected() > 0 {
        debug!(count = pruned.rows_affected(), "expired sessions pruned");
    }

    let session_id = Uuid::new_v4();
    sqlx::query(r#"INSERT INTO sessions (id, user_id, expires_at) VALUES ($1, $2, $3)"#)
        .bind(session_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| write_error(e, "insert session"))?;
    Ok(session_id)
}
