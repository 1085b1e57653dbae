//! User administration: activation state and role assignments.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use authgate_auth::{Caller, codes};
use authgate_core::{AuthError, RoleId, UserId};

use crate::app::dto::UserResponse;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;

pub fn router() -> Router {
    Router::new()
        .route("/:id", get(get_user))
        .route("/:id/deactivate", post(deactivate_user))
        .route("/:id/activate", post(activate_user))
        .route("/:id/roles", get(user_roles))
        .route("/:id/roles/:role_id", post(assign_role).delete(revoke_role))
        .route("/:id/roles/:role_id/restore", post(restore_user_role))
        .route("/:id/roles/:role_id/hard", delete(remove_user_role))
}

/// On these routes a missing user is the target of the request, not the caller.
fn target_user(err: AuthError) -> ApiError {
    match err {
        AuthError::UserNotFound => ApiError(AuthError::NotFound("user")),
        other => ApiError(other),
    }
}

/// GET /users/:id
pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::READ_USER).await?;
    let user = services
        .credentials()
        .get_user(id)
        .await
        .map_err(target_user)?;
    Ok(Json(UserResponse::from(&user)))
}

/// POST /users/:id/deactivate - also rejects the user's live tokens from now on
pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::DELETE_USER).await?;
    services
        .credentials()
        .deactivate_user(id)
        .await
        .map_err(target_user)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /users/:id/activate
pub async fn activate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::RESTORE_USER).await?;
    services
        .credentials()
        .activate_user(id)
        .await
        .map_err(target_user)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /users/:id/roles - active assignments
pub async fn user_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::READ_USER).await?;
    Ok(Json(services.admin().user_roles(id).await?))
}

/// POST /users/:id/roles/:role_id
pub async fn assign_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::MANAGE_USER_ROLES).await?;
    let link = services
        .admin()
        .assign_role(user_id, role_id, caller.user.id)
        .await
        .map_err(target_user)?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// DELETE /users/:id/roles/:role_id - soft delete
pub async fn revoke_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::MANAGE_USER_ROLES).await?;
    let link = services
        .admin()
        .revoke_role(user_id, role_id, caller.user.id)
        .await?;
    Ok(Json(link))
}

/// POST /users/:id/roles/:role_id/restore
pub async fn restore_user_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::MANAGE_USER_ROLES).await?;
    let link = services
        .admin()
        .restore_user_role(user_id, role_id)
        .await?;
    Ok(Json(link))
}

/// DELETE /users/:id/roles/:role_id/hard
pub async fn remove_user_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path((user_id, role_id)): Path<(UserId, RoleId)>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::MANAGE_USER_ROLES).await?;
    services
        .admin()
        .remove_user_role(user_id, role_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
