use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::session::CurrentUser,
    error::ApiError,
    recipes::dto::{CreateRecipeRequest, RecipeEnvelope, RecipeListEnvelope},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/recipes", get(list_recipes).post(create_recipe))
}

#[instrument(skip(state))]
async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<RecipeListEnvelope>, ApiError> {
    let recipes = state.recipes.list_by_owner(user_id).await?;
    Ok(Json(RecipeListEnvelope { recipes }))
}

// The owner is always the session user; nothing in the body can redirect it.
#[instrument(skip(state, payload))]
async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<CreateRecipeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeEnvelope>), ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::MissingBody)?;
    let new_recipe = body.validate()?;
    let recipe = state.recipes.create(user_id, new_recipe).await?;
    info!(recipe_id = %recipe.id, owner = %user_id, "recipe created");
    Ok((StatusCode::CREATED, Json(RecipeEnvelope { recipe })))
}
