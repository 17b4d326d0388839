use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest, UserEnvelope},
        session::AuthSession,
    },
    error::ApiError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/check_session", get(check_session))
        .route("/login", post(login))
        .route("/logout", delete(logout))
}

#[instrument(skip(state, session, payload))]
async fn signup(
    State(state): State<AppState>,
    session: AuthSession,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::MissingBody)?;
    let new_user = body.validate()?;
    let user = state.users.create(new_user).await?;
    session.start(user.id).await?;
    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok((StatusCode::CREATED, Json(UserEnvelope { user })))
}

#[instrument(skip(state, session))]
async fn check_session(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<UserEnvelope>, ApiError> {
    let Some(user_id) = session.current_user_id().await? else {
        return Err(ApiError::unauthorized());
    };
    let Some(user) = state.users.find_by_id(user_id).await? else {
        warn!(%user_id, "session references a missing user");
        return Err(ApiError::unauthorized());
    };
    Ok(Json(UserEnvelope { user }))
}

#[instrument(skip(state, session, payload))]
async fn login(
    State(state): State<AppState>,
    session: AuthSession,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::MissingBody)?;
    let creds = body.validate()?;
    // Unknown username and wrong password are deliberately the same outcome.
    let Some(user) = state.users.verify(&creds.username, &creds.password).await? else {
        warn!(username = %creds.username, "login failed");
        return Err(ApiError::invalid_credentials());
    };
    session.start(user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(UserEnvelope { user }))
}

#[instrument(skip(session))]
async fn logout(session: AuthSession) -> Result<StatusCode, ApiError> {
    session.end().await?;
    Ok(StatusCode::NO_CONTENT)
}
