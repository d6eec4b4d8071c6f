//! Field-level validation shared by users and recipes.
//!
//! A draft (`NewUser`, `NewRecipe`) is unvalidated until [`Validate::validate`]
//! wraps it in [`Validated`]. The store only accepts `Validated<T>`, so every
//! write re-checks the invariants no matter when the draft was built.
//! Every check collects all failing fields instead of stopping at the first one.

use std::fmt;
use std::ops::Deref;

use serde::Serialize;

pub const MIN_INSTRUCTIONS_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Username is required.")]
    UsernameRequired,
    #[error("Password is required.")]
    PasswordRequired,
    #[error("Title is required.")]
    TitleRequired,
    #[error("Instructions must be at least 50 characters long.")]
    InstructionsTooShort,
    #[error("Minutes to complete is required.")]
    MinutesRequired,
}

/// Every field error found in one validation pass, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }

    /// Records `err` when `ok` is false.
    pub fn check(&mut self, ok: bool, err: FieldError) {
        if !ok {
            self.push(err);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, err: FieldError) -> bool {
        self.0.contains(&err)
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(err: FieldError) -> Self {
        Self(vec![err])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(" "))
    }
}

impl std::error::Error for ValidationErrors {}

impl Serialize for ValidationErrors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(ToString::to_string))
    }
}

pub trait Validate {
    /// Runs every field check and reports all failures together.
    fn check(&self) -> Result<(), ValidationErrors>;

    fn validate(self) -> Result<Validated<Self>, ValidationErrors>
    where
        Self: Sized,
    {
        self.check()?;
        Ok(Validated(self))
    }
}

/// A draft that passed its checks. Only constructible through [`Validate::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Validated<T>(T);

impl<T: Validate> Validated<T> {
    /// Reassigns fields and validates again; any failure drops back to the draft state.
    pub fn modify(mut self, f: impl FnOnce(&mut T)) -> Result<Self, (T, ValidationErrors)> {
        f(&mut self.0);
        match self.0.check() {
            Ok(()) => Ok(self),
            Err(errors) => Err((self.0, errors)),
        }
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Validated<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Trimmed, non-empty text or `None`.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
