//! Table definitions, applied in order by [`super::PgStore::ensure_schema`].
//!
//! Constraint and index names are load-bearing: [`super::constraint_for`]
//! translates them back into store-level uniqueness rules.

/// Idempotent DDL statements.
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        username      TEXT NOT NULL,
        email         TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        birthday      DATE NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL,
        is_active     BOOLEAN NOT NULL DEFAULT TRUE,
        CONSTRAINT users_email_key UNIQUE (email)
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS users_username_lower_key
        ON users (LOWER(username))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tokens (
        id          UUID PRIMARY KEY,
        user_id     UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        token_hash  TEXT NOT NULL,
        token_type  TEXT NOT NULL CHECK (token_type IN ('access', 'refresh')),
        is_active   BOOLEAN NOT NULL DEFAULT TRUE,
        created_at  TIMESTAMPTZ NOT NULL,
        expires_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS tokens_user_live_idx
        ON tokens (user_id, token_hash)
        WHERE is_active
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        code        TEXT NOT NULL,
        description TEXT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        created_by  UUID NOT NULL,
        deleted_at  TIMESTAMPTZ NULL,
        deleted_by  UUID NULL,
        is_active   BOOLEAN NOT NULL DEFAULT TRUE,
        CONSTRAINT roles_name_key UNIQUE (name),
        CONSTRAINT roles_code_key UNIQUE (code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS permissions (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        code        TEXT NOT NULL,
        description TEXT NULL,
        created_at  TIMESTAMPTZ NOT NULL,
        created_by  UUID NOT NULL,
        deleted_at  TIMESTAMPTZ NULL,
        deleted_by  UUID NULL,
        is_active   BOOLEAN NOT NULL DEFAULT TRUE,
        CONSTRAINT permissions_name_key UNIQUE (name),
        CONSTRAINT permissions_code_key UNIQUE (code)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users_and_roles (
        id          UUID PRIMARY KEY,
        user_id     UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        role_id     UUID NOT NULL REFERENCES roles (id) ON DELETE CASCADE,
        created_at  TIMESTAMPTZ NOT NULL,
        created_by  UUID NOT NULL,
        deleted_at  TIMESTAMPTZ NULL,
        deleted_by  UUID NULL,
        is_active   BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS users_and_roles_active_pair_key
        ON users_and_roles (user_id, role_id)
        WHERE is_active
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS roles_and_permissions (
        id            UUID PRIMARY KEY,
        role_id       UUID NOT NULL REFERENCES roles (id) ON DELETE CASCADE,
        permission_id UUID NOT NULL REFERENCES permissions (id) ON DELETE CASCADE,
        created_at    TIMESTAMPTZ NOT NULL,
        created_by    UUID NOT NULL,
        deleted_at    TIMESTAMPTZ NULL,
        deleted_by    UUID NULL,
        is_active     BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS roles_and_permissions_active_pair_key
        ON roles_and_permissions (role_id, permission_id)
        WHERE is_active
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::constraint_for;

    #[test]
    fn every_named_unique_rule_is_mapped() {
        let names = [
            "users_username_lower_key",
            "users_email_key",
            "roles_name_key",
            "roles_code_key",
            "permissions_name_key",
            "permissions_code_key",
            "users_and_roles_active_pair_key",
            "roles_and_permissions_active_pair_key",
        ];
        for name in names {
            assert!(
                SCHEMA.iter().any(|stmt| stmt.contains(name)),
                "{name} missing from schema"
            );
            assert!(constraint_for(name).is_some(), "{name} not mapped");
        }
    }
}
