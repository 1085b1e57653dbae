//! Shared shape of the soft-deletable RBAC records.
//!
//! Roles and permissions are *catalog* records (unique name and code).
//! User-role and role-permission assignments are *link* records (at most one
//! active link per pair). Both kinds go through the same generic store port.

use serde::{Deserialize, Serialize};

use authgate_core::{AuditTrail, SoftDeletable};

/// Uniqueness rules a store enforces on insert/update.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    Username,
    Email,
    RoleName,
    RoleCode,
    PermissionName,
    PermissionCode,
    ActiveUserRole,
    ActiveRolePermission,
    PrimaryKey,
}

impl Constraint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Constraint::Username => "username",
            Constraint::Email => "email",
            Constraint::RoleName => "role name",
            Constraint::RoleCode => "role code",
            Constraint::PermissionName => "permission name",
            Constraint::PermissionCode => "permission code",
            Constraint::ActiveUserRole => "active user role",
            Constraint::ActiveRolePermission => "active role permission",
            Constraint::PrimaryKey => "primary key",
        }
    }
}

impl core::fmt::Display for Constraint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A soft-deletable record a generic store can hold.
pub trait Record: SoftDeletable + Clone + Send + Sync + 'static {
    /// The unique constraint `self` would break if stored next to `other`.
    ///
    /// Called only for records with different ids.
    fn conflicts_with(&self, other: &Self) -> Option<Constraint>;
}

/// Partial update of a role or permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
}

impl CatalogUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.code.is_none() && self.description.is_none()
    }
}

/// Named, coded record: [`crate::Role`] and [`crate::Permission`].
pub trait CatalogRecord: Record + Serialize {
    fn new_entry(
        name: String,
        code: String,
        description: Option<String>,
        audit: AuditTrail,
    ) -> Self;

    fn name(&self) -> &str;

    fn code(&self) -> &str;

    fn apply(&mut self, update: CatalogUpdate);
}

/// Many-to-many assignment between two entities.
pub trait LinkRecord: Record + Serialize {
    type Left: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;
    type Right: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// Constraint violated by two active links for the same pair.
    const PAIR_CONSTRAINT: Constraint;

    fn new_link(left: Self::Left, right: Self::Right, audit: AuditTrail) -> Self;

    fn left(&self) -> Self::Left;

    fn right(&self) -> Self::Right;

    fn same_pair(&self, other: &Self) -> bool {
        self.left() == other.left() && self.right() == other.right()
    }
}

/// Implements `Entity`, `SoftDeletable`, `Record` and `CatalogRecord` for a
/// `{ id, name, code, description, audit }` struct.
macro_rules! impl_catalog_record {
    ($t:ty, $id:ty, $kind:literal, $name_c:expr, $code_c:expr) => {
        impl authgate_core::Entity for $t {
            type Id = $id;

            fn id(&self) -> $id {
                self.id
            }
        }

        impl authgate_core::SoftDeletable for $t {
            const KIND: &'static str = $kind;

            fn audit(&self) -> &authgate_core::AuditTrail {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut authgate_core::AuditTrail {
                &mut self.audit
            }
        }

        impl $crate::record::Record for $t {
            fn conflicts_with(&self, other: &Self) -> Option<$crate::record::Constraint> {
                if self.name == other.name {
                    Some($name_c)
                } else if self.code == other.code {
                    Some($code_c)
                } else {
                    None
                }
            }
        }

        impl $crate::record::CatalogRecord for $t {
            fn new_entry(
                name: String,
                code: String,
                description: Option<String>,
                audit: authgate_core::AuditTrail,
            ) -> Self {
                Self {
                    id: <$id>::new(),
                    name,
                    code,
                    description,
                    audit,
                }
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn code(&self) -> &str {
                &self.code
            }

            fn apply(&mut self, update: $crate::record::CatalogUpdate) {
                if let Some(name) = update.name {
                    self.name = name;
                }
                if let Some(code) = update.code {
                    self.code = code;
                }
                if let Some(description) = update.description {
                    self.description = Some(description);
                }
            }
        }
    };
}

/// Implements `Entity`, `SoftDeletable`, `Record` and `LinkRecord` for a
/// `{ id, <left>, <right>, audit }` struct.
macro_rules! impl_link_record {
    ($t:ty, $id:ty, $kind:literal, $left:ident: $lt:ty, $right:ident: $rt:ty, $pair_c:expr) => {
        impl authgate_core::Entity for $t {
            type Id = $id;

            fn id(&self) -> $id {
                self.id
            }
        }

        impl authgate_core::SoftDeletable for $t {
            const KIND: &'static str = $kind;

            fn audit(&self) -> &authgate_core::AuditTrail {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut authgate_core::AuditTrail {
                &mut self.audit
            }
        }

        impl $crate::record::Record for $t {
            fn conflicts_with(&self, other: &Self) -> Option<$crate::record::Constraint> {
                use $crate::record::LinkRecord;
                use authgate_core::SoftDeletable;

                (self.is_active() && other.is_active() && self.same_pair(other))
                    .then_some($pair_c)
            }
        }

        impl $crate::record::LinkRecord for $t {
            type Left = $lt;
            type Right = $rt;

            const PAIR_CONSTRAINT: $crate::record::Constraint = $pair_c;

            fn new_link($left: $lt, $right: $rt, audit: authgate_core::AuditTrail) -> Self {
                Self {
                    id: <$id>::new(),
                    $left,
                    $right,
                    audit,
                }
            }

            fn left(&self) -> $lt {
                self.$left
            }

            fn right(&self) -> $rt {
                self.$right
            }
        }
    };
}

pub(crate) use impl_catalog_record;
pub(crate) use impl_link_record;
