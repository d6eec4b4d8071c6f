use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::AppResult,
    recipes::{dto::CreateRecipeRequest, repo_types::Recipe, services},
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new().route("/recipes", get(list_recipes).post(create_recipe))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
) -> AppResult<Json<Vec<Recipe>>> {
    let recipes = services::list_recipes(state.store.as_ref(), subject.user_id).await?;
    Ok(Json(recipes))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(subject): AuthUser,
    payload: Result<Json<CreateRecipeRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let Json(payload) = payload?;
    let recipe = services::create_recipe(state.store.as_ref(), subject.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}
