use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use authgate_auth::{TokenPair, User};
use authgate_core::UserId;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl core::fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RefreshRequest").finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl core::fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangePasswordRequest").finish_non_exhaustive()
    }
}

// -------------------------
// Response DTOs
// -------------------------

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub birthday: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            birthday: user.birthday,
            created_at: user.created_at,
            is_active: user.is_active,
        }
    }
}

#[derive(Serialize)]
pub struct TokenResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub token_type: &'static str,
}

impl TokenResponse {
    pub fn bearer(tokens: TokenPair) -> Self {
        Self {
            tokens,
            token_type: "bearer",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevokedResponse {
    pub revoked: usize,
}
