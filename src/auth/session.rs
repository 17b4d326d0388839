use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::{
    cookie::{Key, SameSite},
    service::SignedCookie,
    MemoryStore, Session, SessionManagerLayer,
};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::ApiError;

const USER_ID_KEY: &str = "user_id";

/// Builds the session middleware: server-side memory store, opaque signed
/// cookie. Sessions live only as long as the process and the cookie.
pub fn layer(
    cfg: &SessionConfig,
) -> anyhow::Result<SessionManagerLayer<MemoryStore, SignedCookie>> {
    let key = match cfg.secret.as_deref() {
        Some(secret) => Key::try_from(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("SESSION_SECRET unusable as signing key: {e}"))?,
        None => Key::generate(),
    };
    Ok(SessionManagerLayer::new(MemoryStore::default())
        .with_name(cfg.cookie_name.clone())
        .with_secure(cfg.secure)
        .with_same_site(SameSite::Lax)
        .with_signed(key))
}

/// The auth state of the current request: a thin wrapper over the session
/// holding at most one value, the authenticated user's id.
pub struct AuthSession(Session);

impl AuthSession {
    /// Associates the session with `user_id`, replacing any prior association.
    pub async fn start(&self, user_id: Uuid) -> anyhow::Result<()> {
        self.0.insert(USER_ID_KEY, user_id).await?;
        Ok(())
    }

    pub async fn current_user_id(&self) -> anyhow::Result<Option<Uuid>> {
        Ok(self.0.get::<Uuid>(USER_ID_KEY).await?)
    }

    /// Drops the association and the server-side record. Idempotent.
    pub async fn end(&self) -> anyhow::Result<()> {
        self.0.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| ApiError::Internal(anyhow::anyhow!(msg)))?;
        Ok(AuthSession(session))
    }
}

/// Extracts the authenticated user's id, rejecting with 401 when the request
/// carries no live session.
#[derive(Debug)]
pub struct CurrentUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        let user_id = session
            .current_user_id()
            .await?
            .ok_or_else(ApiError::unauthorized)?;
        Ok(CurrentUser(user_id))
    }
}
