use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::{AccessError, Credential, SetPasswordError};
use crate::validation::{non_blank, FieldError, Validate, ValidationErrors};

/// User record as stored in the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String, // Argon2 PHC string
    pub image_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Persisted user. The password is held as a [`Credential`] and cannot be read back.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub image_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: OffsetDateTime,
    credential: Credential,
}

impl User {
    pub fn authenticate(&self, candidate: &str) -> bool {
        self.credential.verify(candidate)
    }

    /// Always fails: the hash is write-only.
    pub fn password_hash(&self) -> Result<&str, AccessError> {
        Err(AccessError("password_hash"))
    }
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            image_url: r.image_url,
            bio: r.bio,
            created_at: r.created_at,
            credential: Credential::from_stored(r.password_hash),
        }
    }
}

/// Unsaved user. Becomes storable once [`Validate::validate`] succeeds.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: Option<String>,
    pub image_url: Option<String>,
    pub bio: Option<String>,
    credential: Credential,
}

impl NewUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, image_url: Option<String>, bio: Option<String>) -> Self {
        self.image_url = image_url;
        self.bio = bio;
        self
    }

    pub fn set_password(&mut self, plain: &str) -> Result<(), SetPasswordError> {
        self.credential.set(plain)
    }

    pub fn authenticate(&self, candidate: &str) -> bool {
        self.credential.verify(candidate)
    }

    pub fn password_hash(&self) -> Result<&str, AccessError> {
        Err(AccessError("password_hash"))
    }

    /// Trimmed username, empty when missing.
    pub fn username(&self) -> &str {
        non_blank(self.username.as_deref()).unwrap_or_default()
    }

    pub(crate) fn credential(&self) -> &Credential {
        &self.credential
    }
}

impl Validate for NewUser {
    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(
            non_blank(self.username.as_deref()).is_some(),
            FieldError::UsernameRequired,
        );
        errors.check(self.credential.is_set(), FieldError::PasswordRequired);
        errors.into_result()
    }
}
