//! Entity traits: identity + the shared soft-delete capability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::id::UserId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}

/// Audit and lifecycle fields shared by roles, permissions and their links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub created_at: DateTime<Utc>,
    pub created_by: UserId,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<UserId>,
    pub is_active: bool,
}

impl AuditTrail {
    pub fn created(by: UserId, at: DateTime<Utc>) -> Self {
        Self {
            created_at: at,
            created_by: by,
            deleted_at: None,
            deleted_by: None,
            is_active: true,
        }
    }
}

/// Reversible deactivation with uniform semantics across entity kinds.
///
/// - `soft_delete` only applies to active records; otherwise `NotFound`.
/// - `restore` only applies to inactive records; otherwise `NotFound`
///   ("not found or already active").
///
/// Hard deletion is a store operation and does not go through this trait.
pub trait SoftDeletable: Entity {
    /// Human-readable kind used in `NotFound` errors (e.g. "role").
    const KIND: &'static str;

    fn audit(&self) -> &AuditTrail;

    fn audit_mut(&mut self) -> &mut AuditTrail;

    fn is_active(&self) -> bool {
        self.audit().is_active
    }

    fn soft_delete(&mut self, by: UserId, at: DateTime<Utc>) -> AuthResult<()> {
        if !self.is_active() {
            return Err(AuthError::NotFound(Self::KIND));
        }
        let audit = self.audit_mut();
        audit.is_active = false;
        audit.deleted_at = Some(at);
        audit.deleted_by = Some(by);
        Ok(())
    }

    fn restore(&mut self) -> AuthResult<()> {
        if self.is_active() {
            return Err(AuthError::NotFound(Self::KIND));
        }
        let audit = self.audit_mut();
        audit.is_active = true;
        audit.deleted_at = None;
        audit.deleted_by = None;
        Ok(())
    }
}
