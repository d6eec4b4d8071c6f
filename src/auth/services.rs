use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest},
        jwt::{JwtKeys, Subject},
        password::burn_verify,
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult},
    store::{Store, StoreError},
    validation::Validate,
};

/// Validates and stores a new user together with its first session, returning the
/// user and a token for that session. Username and password errors are reported together.
#[instrument(skip(store, keys, req), fields(username = ?req.username))]
pub async fn signup(store: &dyn Store, keys: &JwtKeys, req: SignupRequest) -> AppResult<(User, String)> {
    let mut draft = NewUser::default().with_profile(req.image_url, req.bio);
    draft.username = req.username;

    if let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) {
        draft.set_password(password)?;
    }

    let validated = draft.validate().map_err(|errors| {
        warn!(errors = %errors, "signup rejected");
        errors
    })?;

    let expires_at = keys.session_expiry();
    let (user, session_id) = store
        .insert_user_with_session(validated, expires_at)
        .await
        .map_err(|e| {
            if matches!(e, StoreError::UniqueViolation) {
                warn!("username already taken");
            }
            e
        })?;

    let token = keys.sign(
        Subject {
            user_id: user.id,
            session_id,
        },
        expires_at,
    )?;
    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok((user, token))
}

#[instrument(skip(store, req), fields(username = %req.username))]
pub async fn login(store: &dyn Store, req: LoginRequest) -> AppResult<User> {
    // Usernames match exactly; padding is not stripped here.
    let Some(user) = store.find_user_by_username(&req.username).await? else {
        burn_verify(&req.password);
        warn!("login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !user.authenticate(&req.password) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

/// Opens a session row for `user_id` and signs a token naming it.
pub async fn start_session(store: &dyn Store, keys: &JwtKeys, user_id: Uuid) -> AppResult<String> {
    let expires_at = keys.session_expiry();
    let session_id = store.create_session(user_id, expires_at).await?;
    let token = keys.sign(Subject { user_id, session_id }, expires_at)?;
    Ok(token)
}

#[instrument(skip(store))]
pub async fn check_session(store: &dyn Store, user_id: Uuid) -> AppResult<User> {
    store
        .find_user_by_id(user_id)
        .await?
        .ok_or(AppError::Unauthorized)
}

#[instrument(skip(store))]
pub async fn logout(store: &dyn Store, subject: Subject) -> AppResult<()> {
    if !store.delete_session(subject.session_id).await? {
        return Err(AppError::Unauthorized);
    }
    info!(user_id = %subject.user_id, "user logged out");
    Ok(())
}
