//! Role and permission administration endpoints.
//!
//! Every handler checks one permission code before delegating to
//! [`authgate_auth::RbacAdmin`].

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use authgate_auth::{Caller, CatalogUpdate, NewCatalogEntry, codes};
use authgate_core::{PermissionId, RoleId};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/:id",
            get(get_role).patch(update_role).delete(soft_delete_role),
        )
        .route("/roles/:id/restore", post(restore_role))
        .route("/roles/:id/hard", delete(delete_role))
        .route("/roles/:id/permissions", get(role_permissions))
        .route(
            "/roles/:id/permissions/:permission_id",
            post(grant_permission).delete(revoke_permission),
        )
        .route(
            "/roles/:id/permissions/:permission_id/restore",
            post(restore_role_permission),
        )
        .route(
            "/roles/:id/permissions/:permission_id/hard",
            delete(remove_role_permission),
        )
        .route("/permissions", get(list_permissions).post(create_permission))
        .route(
            "/permissions/:id",
            get(get_permission)
                .patch(update_permission)
                .delete(soft_delete_permission),
        )
        .route("/permissions/:id/restore", post(restore_permission))
        .route("/permissions/:id/hard", delete(delete_permission))
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

/// GET /policy/roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::GET_LIST_ROLE).await?;
    Ok(Json(services.admin().list_roles().await?))
}

/// POST /policy/roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<NewCatalogEntry>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::CREATE_ROLE).await?;
    let role = services.admin().create_role(body, caller.user.id).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /policy/roles/:id
pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<RoleId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::READ_ROLE).await?;
    Ok(Json(services.admin().get_role(id).await?))
}

/// PATCH /policy/roles/:id
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<RoleId>,
    Json(body): Json<CatalogUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::UPDATE_ROLE).await?;
    Ok(Json(services.admin().update_role(id, body).await?))
}

/// DELETE /policy/roles/:id - soft delete
pub async fn soft_delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<RoleId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::DELETE_ROLE).await?;
    Ok(Json(
        services.admin().soft_delete_role(id, caller.user.id).await?,
    ))
}

/// POST /policy/roles/:id/restore
pub async fn restore_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<RoleId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::RESTORE_ROLE).await?;
    Ok(Json(services.admin().restore_role(id).await?))
}

/// DELETE /policy/roles/:id/hard
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<RoleId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::DELETE_ROLE).await?;
    services.admin().delete_role(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Role permissions
// ─────────────────────────────────────────────────────────────────────────────

/// GET /policy/roles/:id/permissions - active grants of a role
pub async fn role_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<RoleId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::READ_ROLE).await?;
    Ok(Json(services.admin().role_permissions(id).await?))
}

/// POST /policy/roles/:id/permissions/:permission_id
pub async fn grant_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path((role_id, permission_id)): Path<(RoleId, PermissionId)>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::MANAGE_ROLE_PERMISSIONS).await?;
    let grant = services
        .admin()
        .grant_permission(role_id, permission_id, caller.user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

/// DELETE /policy/roles/:id/permissions/:permission_id - soft delete
pub async fn revoke_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path((role_id, permission_id)): Path<(RoleId, PermissionId)>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::MANAGE_ROLE_PERMISSIONS).await?;
    let grant = services
        .admin()
        .revoke_permission(role_id, permission_id, caller.user.id)
        .await?;
    Ok(Json(grant))
}

/// POST /policy/roles/:id/permissions/:permission_id/restore
pub async fn restore_role_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path((role_id, permission_id)): Path<(RoleId, PermissionId)>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::MANAGE_ROLE_PERMISSIONS).await?;
    let grant = services
        .admin()
        .restore_role_permission(role_id, permission_id)
        .await?;
    Ok(Json(grant))
}

/// DELETE /policy/roles/:id/permissions/:permission_id/hard
pub async fn remove_role_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path((role_id, permission_id)): Path<(RoleId, PermissionId)>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::MANAGE_ROLE_PERMISSIONS).await?;
    services
        .admin()
        .remove_role_permission(role_id, permission_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Permissions
// ─────────────────────────────────────────────────────────────────────────────

/// GET /policy/permissions
pub async fn list_permissions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::GET_LIST_PERMISSION).await?;
    Ok(Json(services.admin().list_permissions().await?))
}

/// POST /policy/permissions
pub async fn create_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Json(body): Json<NewCatalogEntry>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::CREATE_PERMISSION).await?;
    let permission = services
        .admin()
        .create_permission(body, caller.user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

/// GET /policy/permissions/:id
pub async fn get_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<PermissionId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::READ_PERMISSION).await?;
    Ok(Json(services.admin().get_permission(id).await?))
}

/// PATCH /policy/permissions/:id
pub async fn update_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<PermissionId>,
    Json(body): Json<CatalogUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::UPDATE_PERMISSION).await?;
    Ok(Json(services.admin().update_permission(id, body).await?))
}

/// DELETE /policy/permissions/:id - soft delete
pub async fn soft_delete_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<PermissionId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::DELETE_PERMISSION).await?;
    Ok(Json(
        services
            .admin()
            .soft_delete_permission(id, caller.user.id)
            .await?,
    ))
}

/// POST /policy/permissions/:id/restore
pub async fn restore_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<PermissionId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::RESTORE_PERMISSION).await?;
    Ok(Json(services.admin().restore_permission(id).await?))
}

/// DELETE /policy/permissions/:id/hard
pub async fn delete_permission(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<PermissionId>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&services, &caller, codes::DELETE_PERMISSION).await?;
    services.admin().delete_permission(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
