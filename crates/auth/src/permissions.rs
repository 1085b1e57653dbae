use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use authgate_core::{AuditTrail, PermissionId, RoleId, RolePermissionId};

use crate::record::{Constraint, impl_catalog_record, impl_link_record};

/// A grantable capability, identified by its unique `code` (e.g. `create-user`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl_catalog_record!(
    Permission,
    PermissionId,
    "permission",
    Constraint::PermissionName,
    Constraint::PermissionCode
);

/// Grant of a permission to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolePermission {
    pub id: RolePermissionId,
    pub role_id: RoleId,
    pub permission_id: PermissionId,
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl_link_record!(
    RolePermission,
    RolePermissionId,
    "role permission",
    role_id: RoleId,
    permission_id: PermissionId,
    Constraint::ActiveRolePermission
);

/// Permission code as checked by guards.
///
/// Codes are opaque strings; [`codes`] lists the ones the HTTP adapter guards on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionCode(Cow<'static, str>);

impl PermissionCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for PermissionCode {
    fn from(value: &'static str) -> Self {
        Self::from_static(value)
    }
}

/// Well-known permission codes.
pub mod codes {
    use super::PermissionCode;

    pub const GET_LIST_USER: PermissionCode = PermissionCode::from_static("get-list-user");
    pub const READ_USER: PermissionCode = PermissionCode::from_static("read-user");
    pub const CREATE_USER: PermissionCode = PermissionCode::from_static("create-user");
    pub const UPDATE_USER: PermissionCode = PermissionCode::from_static("update-user");
    pub const DELETE_USER: PermissionCode = PermissionCode::from_static("delete-user");
    pub const RESTORE_USER: PermissionCode = PermissionCode::from_static("restore-user");

    pub const GET_LIST_ROLE: PermissionCode = PermissionCode::from_static("get-list-role");
    pub const READ_ROLE: PermissionCode = PermissionCode::from_static("read-role");
    pub const CREATE_ROLE: PermissionCode = PermissionCode::from_static("create-role");
    pub const UPDATE_ROLE: PermissionCode = PermissionCode::from_static("update-role");
    pub const DELETE_ROLE: PermissionCode = PermissionCode::from_static("delete-role");
    pub const RESTORE_ROLE: PermissionCode = PermissionCode::from_static("restore-role");

    pub const GET_LIST_PERMISSION: PermissionCode =
        PermissionCode::from_static("get-list-permission");
    pub const READ_PERMISSION: PermissionCode = PermissionCode::from_static("read-permission");
    pub const CREATE_PERMISSION: PermissionCode = PermissionCode::from_static("create-permission");
    pub const UPDATE_PERMISSION: PermissionCode = PermissionCode::from_static("update-permission");
    pub const DELETE_PERMISSION: PermissionCode = PermissionCode::from_static("delete-permission");
    pub const RESTORE_PERMISSION: PermissionCode =
        PermissionCode::from_static("restore-permission");

    pub const MANAGE_USER_ROLES: PermissionCode = PermissionCode::from_static("manage-user-roles");
    pub const MANAGE_ROLE_PERMISSIONS: PermissionCode =
        PermissionCode::from_static("manage-role-permissions");

    /// Every code above, in seed order.
    pub const ALL: [PermissionCode; 20] = [
        GET_LIST_USER,
        READ_USER,
        CREATE_USER,
        UPDATE_USER,
        DELETE_USER,
        RESTORE_USER,
        GET_LIST_ROLE,
        READ_ROLE,
        CREATE_ROLE,
        UPDATE_ROLE,
        DELETE_ROLE,
        RESTORE_ROLE,
        GET_LIST_PERMISSION,
        READ_PERMISSION,
        CREATE_PERMISSION,
        UPDATE_PERMISSION,
        DELETE_PERMISSION,
        RESTORE_PERMISSION,
        MANAGE_USER_ROLES,
        MANAGE_ROLE_PERMISSIONS,
    ];
}
