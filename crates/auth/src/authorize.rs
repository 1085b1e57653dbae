use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use authgate_core::{AuthError, AuthResult, RoleId, UserId};

use crate::permissions::PermissionCode;
use crate::record::LinkRecord;
use crate::store::RbacStore;
use crate::user::User;

/// Outcome of a permission lookup, with the reason for a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Granted,
    /// The user holds no active role; nothing else was queried.
    NoActiveRoles,
    /// No active role grants an active permission with the code.
    NotGranted,
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted)
    }
}

/// Resolves `user -> role -> permission` for a single code.
///
/// Every call is a fresh lookup: no caching, no role hierarchy.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn RbacStore>,
}

impl core::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PermissionResolver").finish_non_exhaustive()
    }
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn RbacStore>) -> Self {
        Self { store }
    }

    /// True iff the user-role link, the role, the role-permission link and
    /// the permission are all active.
    pub async fn check_permission(&self, user_id: UserId, code: &str) -> AuthResult<bool> {
        Ok(self.explain(user_id, code).await?.is_granted())
    }

    #[instrument(skip(self), err)]
    pub async fn explain(&self, user_id: UserId, code: &str) -> AuthResult<Decision> {
        let links = self.store.user_roles().list_for(user_id, true).await?;
        if links.is_empty() {
            debug!("no active roles");
            return Ok(Decision::NoActiveRoles);
        }

        let role_ids: Vec<RoleId> = links.iter().map(|link| link.right()).collect();
        let decision = if self.store.has_active_grant(&role_ids, code).await? {
            Decision::Granted
        } else {
            Decision::NotGranted
        };

        debug!(?decision, roles = role_ids.len(), "permission resolved");
        Ok(decision)
    }

    /// Build a guard for `code`.
    pub fn require(&self, code: impl Into<PermissionCode>) -> RequirePermission {
        RequirePermission {
            code: code.into(),
            resolver: self.clone(),
        }
    }
}

/// Guard for one permission code, applied to an already-resolved user.
///
/// Fails closed: store errors propagate and anything but a grant is
/// [`AuthError::PermissionDenied`].
#[derive(Debug, Clone)]
pub struct RequirePermission {
    code: PermissionCode,
    resolver: PermissionResolver,
}

impl RequirePermission {
    pub fn code(&self) -> &PermissionCode {
        &self.code
    }

    pub async fn check(&self, user: &User) -> AuthResult<()> {
        if self
            .resolver
            .check_permission(user.id, self.code.as_str())
            .await?
        {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(self.code.to_string()))
        }
    }
}
