//! Authentication/authorization error model.

use thiserror::Error;

/// Result type used across authgate.
pub type AuthResult<T> = Result<T, AuthError>;

/// Failure kinds surfaced by the credential, permission and RBAC services.
///
/// These are *kinds*, not transport codes: the boundary layer maps each kind to
/// its own status. Messages never carry secrets (passwords, raw tokens, hashes).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("username is already taken")]
    DuplicateUsername,

    #[error("email is already registered")]
    DuplicateEmail,

    /// Unknown username and wrong password are deliberately indistinguishable.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("too many active sessions (limit {limit})")]
    TooManyActiveSessions { limit: usize },

    #[error("invalid token")]
    InvalidToken,

    #[error("wrong token type: expected {expected}")]
    WrongTokenType { expected: &'static str },

    #[error("token has been revoked or has expired")]
    TokenRevoked,

    #[error("user not found")]
    UserNotFound,

    #[error("refresh token is invalid or was already used")]
    RefreshTokenInvalid,

    #[error("weak password: {0}")]
    WeakPassword(String),

    #[error("already assigned")]
    AlreadyAssigned,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    /// A role/permission name or code collides with an existing one.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("missing bearer credentials")]
    MissingCredentials,

    #[error("required permission: {0}")]
    PermissionDenied(String),

    /// Storage failure that is not a business outcome.
    #[error("store error: {0}")]
    Store(String),

    /// Unexpected failure in a primitive (hashing, signing).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn weak_password(msg: impl Into<String>) -> Self {
        Self::WeakPassword(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable snake_case identifier of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::DuplicateUsername => "duplicate_username",
            AuthError::DuplicateEmail => "duplicate_email",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::AccountDisabled => "account_disabled",
            AuthError::TooManyActiveSessions { .. } => "too_many_active_sessions",
            AuthError::InvalidToken => "invalid_token",
            AuthError::WrongTokenType { .. } => "wrong_token_type",
            AuthError::TokenRevoked => "token_revoked",
            AuthError::UserNotFound => "user_not_found",
            AuthError::RefreshTokenInvalid => "refresh_token_invalid",
            AuthError::WeakPassword(_) => "weak_password",
            AuthError::AlreadyAssigned => "already_assigned",
            AuthError::NotFound(_) => "not_found",
            AuthError::Validation(_) => "validation",
            AuthError::Conflict(_) => "conflict",
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::PermissionDenied(_) => "permission_denied",
            AuthError::Store(_) => "store",
            AuthError::Internal(_) => "internal",
        }
    }

    /// Whether the failure means "the presented credentials are not acceptable".
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidCredentials
                | AuthError::InvalidToken
                | AuthError::WrongTokenType { .. }
                | AuthError::TokenRevoked
                | AuthError::RefreshTokenInvalid
                | AuthError::MissingCredentials
                | AuthError::UserNotFound
        )
    }
}
