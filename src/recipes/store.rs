use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub instructions: String,
    pub minutes_to_complete: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated recipe input. Handlers validate before this is built; the store
/// assumes the fields are good.
#[derive(Debug)]
pub struct NewRecipe {
    pub title: String,
    pub instructions: String,
    pub minutes_to_complete: Option<i32>,
}

/// Repository for recipes. Every recipe belongs to exactly one owner and all
/// reads are owner-scoped.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn create(&self, owner_id: Uuid, new_recipe: NewRecipe) -> anyhow::Result<Recipe>;
    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Recipe>>;
}

pub struct PgRecipeStore {
    db: PgPool,
}

impl PgRecipeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecipeStore for PgRecipeStore {
    async fn create(&self, owner_id: Uuid, new_recipe: NewRecipe) -> anyhow::Result<Recipe> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (user_id, title, instructions, minutes_to_complete)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, instructions, minutes_to_complete, created_at
            "#,
        )
        .bind(owner_id)
        .bind(&new_recipe.title)
        .bind(&new_recipe.instructions)
        .bind(new_recipe.minutes_to_complete)
        .fetch_one(&self.db)
        .await?;
        Ok(recipe)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, user_id, title, instructions, minutes_to_complete, created_at
            FROM recipes
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

/// In-process store used by `AppState::fake()` and tests.
#[derive(Default)]
pub struct MemoryRecipeStore {
    recipes: Mutex<Vec<Recipe>>,
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn create(&self, owner_id: Uuid, new_recipe: NewRecipe) -> anyhow::Result<Recipe> {
        let recipe = Recipe {
            id: Uuid::new_v4(),
            user_id: owner_id,
            title: new_recipe.title,
            instructions: new_recipe.instructions,
            minutes_to_complete: new_recipe.minutes_to_complete,
            created_at: OffsetDateTime::now_utc(),
        };
        let mut recipes = self
            .recipes
            .lock()
            .map_err(|_| anyhow::anyhow!("recipe store mutex poisoned"))?;
        recipes.push(recipe.clone());
        Ok(recipe)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Recipe>> {
        let recipes = self
            .recipes
            .lock()
            .map_err(|_| anyhow::anyhow!("recipe store mutex poisoned"))?;
        Ok(recipes
            .iter()
            .filter(|r| r.user_id == owner_id)
            .cloned()
            .collect())
    }
}
