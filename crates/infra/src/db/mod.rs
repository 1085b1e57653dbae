//! PostgreSQL-backed implementations of the authgate store ports.
//!
//! One [`PgStore`] serves users, tokens and the four RBAC tables through a
//! shared connection pool.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation, known constraint) | `23505` | `UniqueViolation(_)` | Username, email, role/permission name or code, or active link pair collides |
//! | Database (unique violation, unknown constraint) | `23505` | `Backend` | Constraint not declared by [`SCHEMA`] |
//! | Database (foreign key violation) | `23503` | `NotFound` | Token or link references a missing user, role or permission |
//! | Database (other) | Any other | `Backend` | Check violations, syntax errors, etc. |
//! | RowNotFound | N/A | `NotFound` | Unexpected missing row |
//! | PoolClosed | N/A | `Backend` | Connection pool was closed |
//! | Other | N/A | `Backend` | Network errors, connection failures, decode errors |
//!
//! Unique violations carry the same [`Constraint`](authgate_auth::Constraint)
//! the in-memory stores report, so a race lost at the database surfaces as the
//! same business error as the service's pre-check.
//!
//! ## Thread Safety
//!
//! `PgStore` is `Send + Sync`; all operations go through the SQLx pool.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::instrument;

use authgate_auth::{Permission, Role, RolePermission, StoreResult, UserRole};

mod error;
mod rbac;
mod schema;
mod tokens;
mod users;

pub use error::{constraint_for, map_sqlx_error};
pub use rbac::{AUDIT_COLUMNS, PgLink, PgRecord, PgTable, insert_sql, select_sql, update_sql};
pub use schema::SCHEMA;

/// Postgres-backed user, token and RBAC store.
pub struct PgStore {
    pool: Arc<PgPool>,
    roles: PgTable<Role>,
    permissions: PgTable<Permission>,
    user_roles: PgTable<UserRole>,
    role_permissions: PgTable<RolePermission>,
}

impl core::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PgStore").finish_non_exhaustive()
    }
}

impl PgStore {
    /// Create a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);
        Self {
            roles: PgTable::new(pool.clone()),
            permissions: PgTable::new(pool.clone()),
            user_roles: PgTable::new(pool.clone()),
            role_permissions: PgTable::new(pool.clone()),
            pool,
        }
    }

    /// Open a pool for `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        tracing::info!(statements = SCHEMA.len(), "schema ready");
        Ok(())
    }
}
