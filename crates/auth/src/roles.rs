use serde::Serialize;

use authgate_core::{AuditTrail, RoleId, UserId, UserRoleId};

use crate::record::{Constraint, impl_catalog_record, impl_link_record};

/// A named bundle of permissions that can be assigned to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl_catalog_record!(Role, RoleId, "role", Constraint::RoleName, Constraint::RoleCode);

/// Assignment of a role to a user.
///
/// A removed assignment stays in place (inactive) and is restored on re-assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRole {
    pub id: UserRoleId,
    pub user_id: UserId,
    pub role_id: RoleId,
    #[serde(flatten)]
    pub audit: AuditTrail,
}

impl_link_record!(
    UserRole,
    UserRoleId,
    "user role",
    user_id: UserId,
    role_id: RoleId,
    Constraint::ActiveUserRole
);

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use authgate_core::SoftDeletable;

    use super::*;
    use crate::record::{CatalogRecord, CatalogUpdate, LinkRecord, Record};

    fn role(name: &str, code: &str) -> Role {
        Role::new_entry(
            name.into(),
            code.into(),
            None,
            AuditTrail::created(UserId::new(), Utc::now()),
        )
    }

    #[test]
    fn name_and_code_collisions_are_detected() {
        let admin = role("Admin", "admin");
        assert_eq!(
            admin.conflicts_with(&role("Admin", "other")),
            Some(Constraint::RoleName)
        );
        assert_eq!(
            admin.conflicts_with(&role("Other", "admin")),
            Some(Constraint::RoleCode)
        );
        assert_eq!(admin.conflicts_with(&role("Other", "other")), None);
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut admin = role("Admin", "admin");
        admin.apply(CatalogUpdate {
            description: Some("everything".into()),
            ..CatalogUpdate::default()
        });

        assert_eq!(admin.name, "Admin");
        assert_eq!(admin.code, "admin");
        assert_eq!(admin.description.as_deref(), Some("everything"));
    }

    #[test]
    fn only_active_links_for_the_same_pair_conflict() {
        let user = UserId::new();
        let role = RoleId::new();
        let audit = AuditTrail::created(user, Utc::now());

        let mut first = UserRole::new_link(user, role, audit.clone());
        let second = UserRole::new_link(user, role, audit.clone());
        let other = UserRole::new_link(user, RoleId::new(), audit);

        assert_eq!(second.conflicts_with(&first), Some(Constraint::ActiveUserRole));
        assert_eq!(other.conflicts_with(&first), None);

        first.soft_delete(user, Utc::now()).unwrap();
        assert_eq!(second.conflicts_with(&first), None);
    }

    #[test]
    fn serializes_audit_fields_inline() {
        let json = serde_json::to_value(role("Admin", "admin")).unwrap();
        assert_eq!(json["is_active"], true);
        assert!(json["deleted_at"].is_null());
    }
}
