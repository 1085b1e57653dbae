use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use authgate_core::{AuthError, RoleId, TokenId, UserId};

use crate::claims::TokenKind;
use crate::permissions::{Permission, RolePermission};
use crate::record::{Constraint, LinkRecord, Record};
use crate::roles::{Role, UserRole};
use crate::token::TokenRecord;
use crate::user::User;

/// Store operation error.
///
/// These are *persistence* outcomes. Unique violations carry the constraint so
/// they translate to the same [`AuthError`] kind as the service's pre-checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(Constraint),

    #[error("record not found")]
    NotFound,

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::UniqueViolation(constraint) => match constraint {
                Constraint::Username => AuthError::DuplicateUsername,
                Constraint::Email => AuthError::DuplicateEmail,
                Constraint::ActiveUserRole | Constraint::ActiveRolePermission => {
                    AuthError::AlreadyAssigned
                }
                other => AuthError::conflict(format!("{other} already exists")),
            },
            StoreError::NotFound => AuthError::NotFound("record"),
            StoreError::Backend(msg) => AuthError::store(msg),
        }
    }
}

/// User persistence boundary.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UniqueViolation(Username | Email)` on collision.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Exact lookup.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> StoreResult<()>;

    async fn set_active(&self, id: UserId, active: bool) -> StoreResult<()>;
}

/// Token persistence boundary: plain set operations, no policy.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a batch atomically: either every record is stored or none is.
    async fn insert_tokens(&self, records: &[TokenRecord]) -> StoreResult<()>;

    /// Active and unexpired tokens of any kind.
    async fn count_active(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Active, unexpired token of `kind` with the given digest.
    async fn find_active(
        &self,
        user_id: UserId,
        token_hash: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<TokenRecord>>;

    /// Active token with the given digest, regardless of kind or expiry.
    async fn find_by_hash(&self, user_id: UserId, token_hash: &str)
    -> StoreResult<Option<TokenRecord>>;

    async fn list_active(&self, user_id: UserId, now: DateTime<Utc>)
    -> StoreResult<Vec<TokenRecord>>;

    /// Returns whether an active record was flipped.
    async fn deactivate(&self, id: TokenId) -> StoreResult<bool>;

    /// Returns how many active records were flipped.
    async fn deactivate_all(&self, user_id: UserId) -> StoreResult<usize>;
}

/// Generic persistence for soft-deletable records.
///
/// `get` and `list(false)` see inactive rows too; soft-delete state is the
/// caller's business. `insert`/`update` enforce [`Record::conflicts_with`].
#[async_trait]
pub trait RecordStore<E: Record>: Send + Sync {
    async fn insert(&self, record: &E) -> StoreResult<()>;

    async fn get(&self, id: E::Id) -> StoreResult<Option<E>>;

    /// Overwrite an existing record. `NotFound` if absent.
    async fn update(&self, record: &E) -> StoreResult<()>;

    /// Hard delete. Returns whether a row was removed.
    async fn delete(&self, id: E::Id) -> StoreResult<bool>;

    async fn list(&self, active_only: bool) -> StoreResult<Vec<E>>;
}

/// Link lookups on top of [`RecordStore`].
#[async_trait]
pub trait LinkStore<L: LinkRecord>: RecordStore<L> {
    /// Every link (active or not) for the pair.
    async fn find_pair(&self, left: L::Left, right: L::Right) -> StoreResult<Vec<L>>;

    async fn list_for(&self, left: L::Left, active_only: bool) -> StoreResult<Vec<L>>;
}

/// Role/permission persistence, including the resolver's existence query.
#[async_trait]
pub trait RbacStore: Send + Sync {
    fn roles(&self) -> &dyn RecordStore<Role>;

    fn permissions(&self) -> &dyn RecordStore<Permission>;

    fn user_roles(&self) -> &dyn LinkStore<UserRole>;

    fn role_permissions(&self) -> &dyn LinkStore<RolePermission>;

    /// Whether any active grant links one of the active `role_ids` to an
    /// active permission with `code`.
    async fn has_active_grant(&self, role_ids: &[RoleId], code: &str) -> StoreResult<bool>;
}
