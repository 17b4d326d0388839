use serde::{Deserialize, Serialize};

use crate::auth::store::{NewUser, User};
use crate::error::ApiError;

/// Request body for signup. Fields are optional at the wire level so that a
/// present-but-incomplete body reaches field validation (422) instead of
/// failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl SignupRequest {
    pub fn validate(self) -> Result<NewUser, ApiError> {
        let username = self.username.unwrap_or_default();
        let password = self.password.unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::unprocessable(
                "Username and password are required",
            ));
        }
        Ok(NewUser {
            username,
            password,
            image_url: self.image_url.unwrap_or_default(),
            bio: self.bio.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ApiError> {
        let username = self.username.unwrap_or_default();
        let password = self.password.unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::unprocessable(
                "Username and password are required",
            ));
        }
        Ok(Credentials { username, password })
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}
