//! Generic table adapter for roles, permissions and their link tables.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use authgate_auth::{
    LinkRecord, LinkStore, Permission, RbacStore, Record, RecordStore, Role, RolePermission,
    StoreError, StoreResult, UserRole,
};
use authgate_core::{
    AuditTrail, PermissionId, RoleId, RolePermissionId, SoftDeletable, UserId, UserRoleId,
};

use super::{PgStore, map_sqlx_error};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Lifecycle columns shared by every RBAC table, bound after the record's own.
pub const AUDIT_COLUMNS: [&str; 5] = [
    "created_at",
    "created_by",
    "deleted_at",
    "deleted_by",
    "is_active",
];

/// A [`Record`] persisted in its own table.
pub trait PgRecord: Record {
    const TABLE: &'static str;

    /// Record-specific columns, `id` first. Audit columns are implied.
    const COLUMNS: &'static [&'static str];

    fn key(id: Self::Id) -> Uuid;

    /// Bind [`Self::COLUMNS`] in order.
    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;

    fn decode(row: &PgRow) -> Result<Self, sqlx::Error>;
}

/// A [`LinkRecord`] table, filtered by its two foreign-key columns.
pub trait PgLink: PgRecord + LinkRecord {
    const LEFT: &'static str;
    const RIGHT: &'static str;

    fn left_key(left: Self::Left) -> Uuid;

    fn right_key(right: Self::Right) -> Uuid;
}

fn all_columns(columns: &[&str]) -> Vec<String> {
    columns
        .iter()
        .chain(AUDIT_COLUMNS.iter())
        .map(|c| c.to_string())
        .collect()
}

pub fn select_sql(table: &str, columns: &[&str]) -> String {
    format!("SELECT {} FROM {}", all_columns(columns).join(", "), table)
}

pub fn insert_sql(table: &str, columns: &[&str]) -> String {
    let columns = all_columns(columns);
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// `UPDATE` keyed on the first column (`$1`); the rest are overwritten.
pub fn update_sql(table: &str, columns: &[&str]) -> String {
    let columns = all_columns(columns);
    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, c)| format!("{} = ${}", c, i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {} = $1",
        table,
        assignments.join(", "),
        columns[0]
    )
}

fn bind_audit<'q>(query: PgQuery<'q>, audit: &AuditTrail) -> PgQuery<'q> {
    query
        .bind(audit.created_at)
        .bind(Uuid::from(audit.created_by))
        .bind(audit.deleted_at)
        .bind(audit.deleted_by.map(Uuid::from))
        .bind(audit.is_active)
}

fn decode_audit(row: &PgRow) -> Result<AuditTrail, sqlx::Error> {
    Ok(AuditTrail {
        created_at: row.try_get("created_at")?,
        created_by: UserId::from_uuid(row.try_get("created_by")?),
        deleted_at: row.try_get("deleted_at")?,
        deleted_by: row
            .try_get::<Option<Uuid>, _>("deleted_by")?
            .map(UserId::from_uuid),
        is_active: row.try_get("is_active")?,
    })
}

fn decode_rows<E: PgRecord>(operation: &str, rows: &[PgRow]) -> StoreResult<Vec<E>> {
    rows.iter()
        .map(E::decode)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error(operation, e))
}

// ─────────────────────────────────────────────────────────────────────────────
// Record mappings
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! impl_pg_catalog {
    ($t:ty, $id:ty, $table:literal) => {
        impl PgRecord for $t {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] = &["id", "name", "code", "description"];

            fn key(id: $id) -> Uuid {
                Uuid::from(id)
            }

            fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
                query
                    .bind(self.id.as_uuid())
                    .bind(self.name.as_str())
                    .bind(self.code.as_str())
                    .bind(self.description.as_deref())
            }

            fn decode(row: &PgRow) -> Result<Self, sqlx::Error> {
                Ok(Self {
                    id: <$id>::from_uuid(row.try_get("id")?),
                    name: row.try_get("name")?,
                    code: row.try_get("code")?,
                    description: row.try_get("description")?,
                    audit: decode_audit(row)?,
                })
            }
        }
    };
}

macro_rules! impl_pg_link {
    (
        $t:ty, $id:ty, $table:literal,
        $left:ident: $lt:ty, $right:ident: $rt:ty
    ) => {
        impl PgRecord for $t {
            const TABLE: &'static str = $table;
            const COLUMNS: &'static [&'static str] =
                &["id", stringify!($left), stringify!($right)];

            fn key(id: $id) -> Uuid {
                Uuid::from(id)
            }

            fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
                query
                    .bind(self.id.as_uuid())
                    .bind(self.$left.as_uuid())
                    .bind(self.$right.as_uuid())
            }

            fn decode(row: &PgRow) -> Result<Self, sqlx::Error> {
                Ok(Self {
                    id: <$id>::from_uuid(row.try_get("id")?),
                    $left: <$lt>::from_uuid(row.try_get(stringify!($left))?),
                    $right: <$rt>::from_uuid(row.try_get(stringify!($right))?),
                    audit: decode_audit(row)?,
                })
            }
        }

        impl PgLink for $t {
            const LEFT: &'static str = stringify!($left);
            const RIGHT: &'static str = stringify!($right);

            fn left_key(left: $lt) -> Uuid {
                Uuid::from(left)
            }

            fn right_key(right: $rt) -> Uuid {
                Uuid::from(right)
            }
        }
    };
}

impl_pg_catalog!(Role, RoleId, "roles");
impl_pg_catalog!(Permission, PermissionId, "permissions");
impl_pg_link!(
    UserRole, UserRoleId, "users_and_roles",
    user_id: UserId, role_id: RoleId
);
impl_pg_link!(
    RolePermission, RolePermissionId, "roles_and_permissions",
    role_id: RoleId, permission_id: PermissionId
);

// ─────────────────────────────────────────────────────────────────────────────
// Generic table
// ─────────────────────────────────────────────────────────────────────────────

/// Postgres-backed [`RecordStore`] for one record type.
pub struct PgTable<E> {
    pool: Arc<PgPool>,
    _record: PhantomData<fn() -> E>,
}

impl<E> PgTable<E> {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<E: PgRecord> RecordStore<E> for PgTable<E> {
    #[instrument(skip(self, record), fields(table = E::TABLE), err)]
    async fn insert(&self, record: &E) -> StoreResult<()> {
        let sql = insert_sql(E::TABLE, E::COLUMNS);
        let query = bind_audit(record.bind_columns(sqlx::query(&sql)), record.audit());
        query
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(())
    }

    async fn get(&self, id: E::Id) -> StoreResult<Option<E>> {
        let sql = format!("{} WHERE id = $1", select_sql(E::TABLE, E::COLUMNS));
        let row = sqlx::query(&sql)
            .bind(E::key(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.as_ref()
            .map(E::decode)
            .transpose()
            .map_err(|e| map_sqlx_error("get", e))
    }

    #[instrument(skip(self, record), fields(table = E::TABLE), err)]
    async fn update(&self, record: &E) -> StoreResult<()> {
        let sql = update_sql(E::TABLE, E::COLUMNS);
        let query = bind_audit(record.bind_columns(sqlx::query(&sql)), record.audit());
        let result = query
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(table = E::TABLE), err)]
    async fn delete(&self, id: E::Id) -> StoreResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = sqlx::query(&sql)
            .bind(E::key(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, active_only: bool) -> StoreResult<Vec<E>> {
        let filter = if active_only { " WHERE is_active" } else { "" };
        let sql = format!(
            "{}{} ORDER BY created_at",
            select_sql(E::TABLE, E::COLUMNS),
            filter
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list", e))?;

        decode_rows("list", &rows)
    }
}

#[async_trait]
impl<L: PgLink> LinkStore<L> for PgTable<L> {
    async fn find_pair(&self, left: L::Left, right: L::Right) -> StoreResult<Vec<L>> {
        let sql = format!(
            "{} WHERE {} = $1 AND {} = $2 ORDER BY created_at",
            select_sql(L::TABLE, L::COLUMNS),
            L::LEFT,
            L::RIGHT
        );
        let rows = sqlx::query(&sql)
            .bind(L::left_key(left))
            .bind(L::right_key(right))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_pair", e))?;

        decode_rows("find_pair", &rows)
    }

    async fn list_for(&self, left: L::Left, active_only: bool) -> StoreResult<Vec<L>> {
        let filter = if active_only { " AND is_active" } else { "" };
        let sql = format!(
            "{} WHERE {} = $1{} ORDER BY created_at",
            select_sql(L::TABLE, L::COLUMNS),
            L::LEFT,
            filter
        );
        let rows = sqlx::query(&sql)
            .bind(L::left_key(left))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_for", e))?;

        decode_rows("list_for", &rows)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RbacStore
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RbacStore for PgStore {
    fn roles(&self) -> &dyn RecordStore<Role> {
        &self.roles
    }

    fn permissions(&self) -> &dyn RecordStore<Permission> {
        &self.permissions
    }

    fn user_roles(&self) -> &dyn LinkStore<UserRole> {
        &self.user_roles
    }

    fn role_permissions(&self) -> &dyn LinkStore<RolePermission> {
        &self.role_permissions
    }

    #[instrument(skip(self, role_ids), fields(roles = role_ids.len()), err)]
    async fn has_active_grant(&self, role_ids: &[RoleId], code: &str) -> StoreResult<bool> {
        if role_ids.is_empty() {
            return Ok(false);
        }

        let ids: Vec<Uuid> = role_ids.iter().map(|id| Uuid::from(*id)).collect();
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM roles_and_permissions rp
                JOIN roles r ON r.id = rp.role_id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE rp.role_id = ANY($1)
                  AND rp.is_active
                  AND r.is_active
                  AND p.is_active
                  AND p.code = $2
            ) AS granted
            "#,
        )
        .bind(ids)
        .bind(code)
        .fetch_one(self.pool())
        .await
        .map_err(|e| map_sqlx_error("has_active_grant", e))?;

        let granted: bool = row
            .try_get("granted")
            .map_err(|e| map_sqlx_error("has_active_grant", e))?;
        debug!(granted, "grant lookup");
        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_binds_record_then_audit_columns() {
        assert_eq!(
            insert_sql("roles", &["id", "name"]),
            "INSERT INTO roles (id, name, created_at, created_by, deleted_at, deleted_by, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
    }

    #[test]
    fn update_is_keyed_on_first_column() {
        assert_eq!(
            update_sql("roles", &["id", "name"]),
            "UPDATE roles SET name = $2, created_at = $3, created_by = $4, deleted_at = $5, \
             deleted_by = $6, is_active = $7 WHERE id = $1"
        );
    }

    #[test]
    fn select_lists_every_column() {
        let sql = select_sql(UserRole::TABLE, UserRole::COLUMNS);
        assert_eq!(
            sql,
            "SELECT id, user_id, role_id, created_at, created_by, deleted_at, deleted_by, is_active \
             FROM users_and_roles"
        );
    }

    #[test]
    fn link_tables_filter_on_their_foreign_keys() {
        assert_eq!(UserRole::LEFT, "user_id");
        assert_eq!(UserRole::RIGHT, "role_id");
        assert_eq!(RolePermission::LEFT, "role_id");
        assert_eq!(RolePermission::RIGHT, "permission_id");
        assert_eq!(RolePermission::COLUMNS, &["id", "role_id", "permission_id"]);
    }

    #[test]
    fn catalog_tables_share_one_layout() {
        assert_eq!(Role::TABLE, "roles");
        assert_eq!(Permission::TABLE, "permissions");
        assert_eq!(Role::COLUMNS, Permission::COLUMNS);
    }
}
