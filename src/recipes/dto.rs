use serde::Deserialize;

/// Request body for creating a recipe. Every field is optional here so that
/// missing values are reported as validation errors, not rejected by the parser.
#[derive(Debug, Default, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: Option<String>,
    pub instructions: Option<String>,
    pub minutes_to_complete: Option<i32>,
}
