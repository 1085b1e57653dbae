//! Account and session endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use authgate_auth::{Caller, LoginRequest, RegistrationRequest};

use crate::app::dto::{
    ChangePasswordRequest, RefreshRequest, RevokedResponse, TokenResponse, UserResponse,
};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/change-password", post(change_password))
        .route("/auth/tokens", get(tokens))
}

/// POST /auth/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RegistrationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = services.credentials();
    body.validate(credentials.now().date_naive())?;

    let user = credentials.register(&body).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /auth/login - authenticate and issue an access/refresh pair
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;

    let credentials = services.credentials();
    let user = credentials
        .authenticate(&body.username, &body.password)
        .await?;
    let pair = credentials.issue_token_pair(&user).await?;
    Ok(Json(TokenResponse::bearer(pair)))
}

/// POST /auth/refresh - exchange a refresh token for a new pair
pub async fn refresh(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pair = services
        .credentials()
        .rotate_tokens(&body.refresh_token)
        .await?;
    Ok(Json(TokenResponse::bearer(pair)))
}

/// GET /auth/me
pub async fn me(Extension(caller): Extension<Caller>) -> impl IntoResponse {
    Json(UserResponse::from(&caller.user))
}

/// POST /auth/logout - revoke the presented access token
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    services
        .credentials()
        .logout(&caller.token, &caller.user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout-all - revoke every token of the caller
pub async fn logout_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = services.credentials().logout_all(&caller.user).await?;
    Ok(Json(RevokedResponse { revoked }))
}

/// POST /auth/change-password - also signs out every session
pub async fn change_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    services
        .credentials()
        .change_password(&caller.user, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/tokens - live sessions of the caller
pub async fn tokens(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = services
        .credentials()
        .list_active_tokens(&caller.user)
        .await?;
    Ok(Json(tokens))
}
