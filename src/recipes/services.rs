use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    recipes::{
        dto::CreateRecipeRequest,
        repo_types::{NewRecipe, Recipe},
    },
    store::Store,
    validation::Validate,
};

#[instrument(skip(store))]
pub async fn list_recipes(store: &dyn Store, user_id: Uuid) -> AppResult<Vec<Recipe>> {
    if store.find_user_by_id(user_id).await?.is_none() {
        warn!(%user_id, "session user no longer exists");
        return Err(AppError::NotFound("User not found"));
    }
    Ok(store.list_recipes_by_user(user_id).await?)
}

/// Validates the draft for `user_id` and stores it. All field errors are returned together.
#[instrument(skip(store, req))]
pub async fn create_recipe(
    store: &dyn Store,
    user_id: Uuid,
    req: CreateRecipeRequest,
) -> AppResult<Recipe> {
    let draft = NewRecipe {
        user_id,
        title: req.title,
        instructions: req.instructions,
        minutes_to_complete: req.minutes_to_complete,
    };
    let validated = draft.validate().map_err(|errors| {
        warn!(%user_id, errors = %errors, "recipe rejected");
        errors
    })?;

    let recipe = store.insert_recipe(validated).await?;
    info!(%user_id, recipe_id = %recipe.id, "recipe created");
    Ok(recipe)
}
