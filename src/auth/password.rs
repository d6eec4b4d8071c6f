use std::fmt;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

use crate::validation::FieldError;

/// Raised when code tries to read a write-only secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is write-only and cannot be read")]
pub struct AccessError(pub &'static str);

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

lazy_static! {
    /// Hash of a password nobody holds, verified against when a login names no user.
    static ref DUMMY_HASH: String = hash_password("recipebox-no-such-user").unwrap_or_default();
}

/// Runs one Argon2 verification that always fails, so a login for an unknown
/// user costs the same as a login with a wrong password.
pub fn burn_verify(candidate: &str) {
    let _ = verify_password(candidate, &DUMMY_HASH);
}

#[derive(Debug, thiserror::Error)]
pub enum SetPasswordError {
    #[error(transparent)]
    Invalid(FieldError),
    #[error("hash password: {0}")]
    Hash(anyhow::Error),
}

/// Salted Argon2 hash of a user's password. Can be set and verified, never read.
#[derive(Clone, Default)]
pub struct Credential {
    phc: Option<String>,
}

impl Credential {
    /// Hashes `plain` and keeps only the PHC string.
    pub fn set(&mut self, plain: &str) -> Result<(), SetPasswordError> {
        if plain.is_empty() {
            return Err(SetPasswordError::Invalid(FieldError::PasswordRequired));
        }
        self.phc = Some(hash_password(plain).map_err(SetPasswordError::Hash)?);
        Ok(())
    }

    pub fn from_plain(plain: &str) -> Result<Self, SetPasswordError> {
        let mut credential = Self::default();
        credential.set(plain)?;
        Ok(credential)
    }

    /// Constant-time check of `candidate`; false on mismatch, unset or corrupt hash.
    pub fn verify(&self, candidate: &str) -> bool {
        let Some(phc) = self.phc.as_deref() else {
            return false;
        };
        verify_password(candidate, phc).unwrap_or(false)
    }

    pub fn is_set(&self) -> bool {
        self.phc.is_some()
    }

    pub(crate) fn from_stored(phc: String) -> Self {
        Self { phc: Some(phc) }
    }

    /// PHC string for the store's insert path.
    pub(crate) fn stored(&self) -> Option<&str> {
        self.phc.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_set() { "Credential(<redacted>)" } else { "Credential(<unset>)" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn credential_accepts_only_the_password_it_was_set_with() {
        let credential = Credential::from_plain("pw123").expect("set");
        assert!(credential.verify("pw123"));
        assert!(!credential.verify("pw1234"));
        assert!(!credential.verify(""));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = Credential::from_plain("pw123").unwrap();
        let b = Credential::from_plain("pw123").unwrap();
        assert_ne!(a.stored(), b.stored());
    }

    #[test]
    fn empty_password_is_rejected() {
        let err = Credential::from_plain("").unwrap_err();
        assert!(matches!(err, SetPasswordError::Invalid(FieldError::PasswordRequired)));
    }

    #[test]
    fn corrupt_or_unset_hash_never_verifies() {
        assert!(!Credential::default().verify("anything"));
        assert!(!Credential::from_stored("garbage".into()).verify("garbage"));
    }

    #[test]
    fn dummy_hash_is_a_real_argon2_hash() {
        assert!(DUMMY_HASH.starts_with("$argon2"));
        assert!(!verify_password("", &DUMMY_HASH).unwrap());
        burn_verify("pw123");
    }

    #[test]
    fn debug_output_is_redacted() {
        let credential = Credential::from_plain("hunter22").unwrap();
        let shown = format!("{credential:?}");
        assert!(!shown.contains("argon2"));
        assert!(!shown.contains("hunter22"));
    }
}
