use authgate_auth::{Constraint, StoreError};

/// Map a PostgreSQL constraint (or unique index) name to the store-level rule.
pub fn constraint_for(name: &str) -> Option<Constraint> {
    match name {
        "users_username_lower_key" => Some(Constraint::Username),
        "users_email_key" => Some(Constraint::Email),
        "roles_name_key" => Some(Constraint::RoleName),
        "roles_code_key" => Some(Constraint::RoleCode),
        "permissions_name_key" => Some(Constraint::PermissionName),
        "permissions_code_key" => Some(Constraint::PermissionCode),
        "users_and_roles_active_pair_key" => Some(Constraint::ActiveUserRole),
        "roles_and_permissions_active_pair_key" => Some(Constraint::ActiveRolePermission),
        other if other.ends_with("_pkey") => Some(Constraint::PrimaryKey),
        _ => None,
    }
}

/// Map SQLx errors to `StoreError`.
///
/// See the module docs for the full mapping table.
pub fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                // Unique violation
                Some("23505") => db_err
                    .constraint()
                    .and_then(constraint_for)
                    .map(StoreError::UniqueViolation)
                    .unwrap_or(StoreError::Backend(msg)),
                // Foreign key violation
                Some("23503") => StoreError::NotFound,
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
