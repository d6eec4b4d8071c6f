use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::validation::{non_blank, FieldError, Validate, Validated, ValidationErrors, MIN_INSTRUCTIONS_LEN};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub instructions: String,
    pub minutes_to_complete: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Unsaved recipe owned by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub minutes_to_complete: Option<i32>,
}

impl NewRecipe {
    pub fn new(
        user_id: Uuid,
        title: impl Into<String>,
        instructions: impl Into<String>,
        minutes_to_complete: i32,
    ) -> Self {
        Self {
            user_id,
            title: Some(title.into()),
            instructions: Some(instructions.into()),
            minutes_to_complete: Some(minutes_to_complete),
        }
    }
}

impl Validate for NewRecipe {
    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(
            non_blank(self.title.as_deref()).is_some(),
            FieldError::TitleRequired,
        );
        errors.check(
            non_blank(self.instructions.as_deref())
                .is_some_and(|i| i.chars().count() >= MIN_INSTRUCTIONS_LEN),
            FieldError::InstructionsTooShort,
        );
        errors.check(
            self.minutes_to_complete.is_some(),
            FieldError::MinutesRequired,
        );
        errors.into_result()
    }
}

// Field accessors for the store; presence was checked by `validate`.
impl Validated<NewRecipe> {
    pub fn title(&self) -> &str {
        non_blank(self.title.as_deref()).unwrap_or_default()
    }

    pub fn instructions(&self) -> &str {
        non_blank(self.instructions.as_deref()).unwrap_or_default()
    }

    pub fn minutes(&self) -> i32 {
        self.minutes_to_complete.unwrap_or_default()
    }
}
