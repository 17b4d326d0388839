use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::recipes::store::{NewRecipe, Recipe};

/// Instructions must be at least this many characters (characters, not bytes).
const MIN_INSTRUCTIONS_CHARS: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct CreateRecipeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub minutes_to_complete: Option<i32>,
}

impl CreateRecipeRequest {
    pub fn validate(self) -> Result<NewRecipe, ApiError> {
        let title = self.title.unwrap_or_default();
        let instructions = self.instructions.unwrap_or_default();
        if title.is_empty() || instructions.chars().count() < MIN_INSTRUCTIONS_CHARS {
            return Err(ApiError::unprocessable(
                "Title and instructions (at least 50 characters) are required",
            ));
        }
        Ok(NewRecipe {
            title,
            instructions,
            minutes_to_complete: self.minutes_to_complete,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeEnvelope {
    pub recipe: Recipe,
}

#[derive(Debug, Serialize)]
pub struct RecipeListEnvelope {
    pub recipes: Vec<Recipe>,
}
