use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use authgate_core::AuthError;

/// HTTP status for each failure kind.
pub fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Validation(_) | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
        AuthError::DuplicateUsername
        | AuthError::DuplicateEmail
        | AuthError::AlreadyAssigned
        | AuthError::Conflict(_) => StatusCode::CONFLICT,
        AuthError::InvalidCredentials
        | AuthError::InvalidToken
        | AuthError::WrongTokenType { .. }
        | AuthError::TokenRevoked
        | AuthError::RefreshTokenInvalid
        | AuthError::MissingCredentials
        | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
        AuthError::AccountDisabled | AuthError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        AuthError::TooManyActiveSessions { .. } => StatusCode::TOO_MANY_REQUESTS,
        AuthError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthError::Store(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handler error: any [`AuthError`] rendered as `{ "error", "message" }`.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            return json_error(status, self.0.kind(), "internal server error");
        }
        json_error(status, self.0.kind(), self.0.to_string())
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
