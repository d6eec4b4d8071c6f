use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, SignupRequest},
        jwt::{AuthUser, JwtKeys},
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/check_session", get(check_session))
        .route("/logout", delete(logout))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_config(&state.config.jwt);
    let (user, access_token) = services::signup(state.store.as_ref(), &keys, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let user = services::login(state.store.as_ref(), payload).await?;
    let keys = JwtKeys::from_config(&state.config.jwt);
    let access_token = services::start_session(state.store.as_ref(), &keys, user.id).await?;
    Ok(Json(AuthResponse {
        access_token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn check_session(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = services::check_session(state.store.as_ref(), subject.user_id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
) -> AppResult<StatusCode> {
    services::logout(state.store.as_ref(), subject).await?;
    Ok(StatusCode::NO_CONTENT)
}
