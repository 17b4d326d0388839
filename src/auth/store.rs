use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::error::ApiError;

/// User record as persisted. The password hash never reaches serialized
/// output.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub image_url: String,
    pub bio: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated signup input. Carries the raw password, so no Debug/Serialize.
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub image_url: String,
    pub bio: String,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Username already exists")]
    UsernameTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::UsernameTaken => {
                ApiError::unprocessable("Username already exists")
            }
            CredentialError::Other(e) => ApiError::Internal(e),
        }
    }
}

/// Repository for user identities. `create` hashes the password before
/// writing; `verify` folds "unknown username" and "wrong password" into the
/// same `None` so callers cannot distinguish them.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, CredentialError>;
    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, CredentialError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CredentialError>;
}

pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, new_user: NewUser) -> Result<User, CredentialError> {
        let hash = hash_password(&new_user.password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, image_url, bio)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password_hash, image_url, bio, created_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&hash)
        .bind(&new_user.image_url)
        .bind(&new_user.bio)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            // The UNIQUE constraint on username is the single source of truth
            // for conflicts; concurrent inserts race at the database, not here.
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CredentialError::UsernameTaken
            }
            other => CredentialError::Other(other.into()),
        })?;
        Ok(user)
    }

    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, CredentialError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, image_url, bio, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .map_err(anyhow::Error::from)?;

        let Some(user) = user else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CredentialError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, image_url, bio, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(anyhow::Error::from)?;
        Ok(user)
    }
}

/// In-process store used by `AppState::fake()` and tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<User>>,
}

impl MemoryCredentialStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<User>>, CredentialError> {
        self.users
            .lock()
            .map_err(|_| CredentialError::Other(anyhow::anyhow!("user store mutex poisoned")))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, new_user: NewUser) -> Result<User, CredentialError> {
        let password_hash = hash_password(&new_user.password)?;
        let mut users = self.lock()?;
        if users.iter().any(|u| u.username == new_user.username) {
            return Err(CredentialError::UsernameTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            password_hash,
            image_url: new_user.image_url,
            bio: new_user.bio,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, CredentialError> {
        let user = {
            let users = self.lock()?;
            users.iter().find(|u| u.username == username).cloned()
        };
        let Some(user) = user else {
            return Ok(None);
        };
        if verify_password(password, &user.password_hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, CredentialError> {
        let users = self.lock()?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.into(),
            password: password.into(),
            image_url: String::new(),
            bio: String::new(),
        }
    }

    #[tokio::test]
    async fn create_hashes_password() {
        let store = MemoryCredentialStore::default();
        let user = store.create(new_user("ana", "pw123")).await.expect("create");
        assert_ne!(user.password_hash, "pw123");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let store = MemoryCredentialStore::default();
        store.create(new_user("ana", "pw123")).await.expect("create");
        let err = store.create(new_user("ana", "other")).await.unwrap_err();
        assert!(matches!(err, CredentialError::UsernameTaken));
        // First user untouched and still verifiable.
        let found = store.verify("ana", "pw123").await.expect("verify");
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn verify_folds_unknown_user_and_wrong_password() {
        let store = MemoryCredentialStore::default();
        store.create(new_user("ana", "pw123")).await.expect("create");
        assert!(store.verify("ana", "wrong").await.expect("verify").is_none());
        assert!(store.verify("nobody", "pw123").await.expect("verify").is_none());
    }

    #[tokio::test]
    async fn find_by_id_roundtrip() {
        let store = MemoryCredentialStore::default();
        let user = store.create(new_user("ana", "pw123")).await.expect("create");
        let found = store.find_by_id(user.id).await.expect("find").expect("some");
        assert_eq!(found.username, "ana");
        assert!(store
            .find_by_id(Uuid::new_v4())
            .await
            .expect("find")
            .is_none());
    }

    #[test]
    fn serialized_user_never_exposes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "ana".into(),
            password_hash: "$argon2id$secret".into(),
            image_url: String::new(),
            bio: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&user).expect("serialize");
        let obj = json.as_object().expect("object");
        assert!(obj.contains_key("username"));
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("password"));
    }
}
