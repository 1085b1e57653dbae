use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use authgate_core::{Entity, RoleId, SoftDeletable, TokenId, UserId};

use super::r#trait::{
    LinkStore, RbacStore, RecordStore, StoreError, StoreResult, TokenStore, UserStore,
};
use crate::claims::TokenKind;
use crate::permissions::{Permission, RolePermission};
use crate::record::{Constraint, LinkRecord, Record};
use crate::roles::{Role, UserRole};
use crate::token::TokenRecord;
use crate::user::User;

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory user store.
///
/// Intended for tests/dev. Enforces the same uniqueness rules as the
/// relational schema.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn modify<F>(&self, id: UserId, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        f(user);
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().map_err(|_| poisoned())?;

        let key = User::username_key(&user.username);
        for existing in users.values() {
            if existing.id == user.id {
                return Err(StoreError::UniqueViolation(Constraint::PrimaryKey));
            }
            if User::username_key(&existing.username) == key {
                return Err(StoreError::UniqueViolation(Constraint::Username));
            }
            if existing.email == user.email {
                return Err(StoreError::UniqueViolation(Constraint::Email));
            }
        }

        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let key = User::username_key(username);
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users
            .values()
            .find(|u| User::username_key(&u.username) == key)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> StoreResult<()> {
        self.modify(id, |user| user.password_hash = password_hash.to_string())
    }

    async fn set_active(&self, id: UserId, active: bool) -> StoreResult<()> {
        self.modify(id, |user| user.is_active = active)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokens
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory token store. Records are only ever deactivated.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<TokenId, TokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record ever written for `user_id`, including inactive ones.
    pub fn all_for(&self, user_id: UserId) -> StoreResult<Vec<TokenRecord>> {
        let tokens = self.tokens.read().map_err(|_| poisoned())?;
        let mut out: Vec<_> = tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        Ok(out)
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert_tokens(&self, records: &[TokenRecord]) -> StoreResult<()> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;

        // Validate the whole batch before writing any of it.
        for (idx, record) in records.iter().enumerate() {
            let repeated = records[..idx].iter().any(|r| r.id == record.id);
            if repeated || tokens.contains_key(&record.id) {
                return Err(StoreError::UniqueViolation(Constraint::PrimaryKey));
            }
        }

        for record in records {
            tokens.insert(record.id, record.clone());
        }
        Ok(())
    }

    async fn count_active(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<usize> {
        let tokens = self.tokens.read().map_err(|_| poisoned())?;
        Ok(tokens
            .values()
            .filter(|t| t.user_id == user_id && t.is_live(now))
            .count())
    }

    async fn find_active(
        &self,
        user_id: UserId,
        token_hash: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<TokenRecord>> {
        let tokens = self.tokens.read().map_err(|_| poisoned())?;
        Ok(tokens
            .values()
            .find(|t| {
                t.user_id == user_id && t.token_hash == token_hash && t.kind == kind && t.is_live(now)
            })
            .cloned())
    }

    async fn find_by_hash(
        &self,
        user_id: UserId,
        token_hash: &str,
    ) -> StoreResult<Option<TokenRecord>> {
        let tokens = self.tokens.read().map_err(|_| poisoned())?;
        Ok(tokens
            .values()
            .find(|t| t.user_id == user_id && t.token_hash == token_hash && t.is_active)
            .cloned())
    }

    async fn list_active(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<TokenRecord>> {
        let tokens = self.tokens.read().map_err(|_| poisoned())?;
        let mut out: Vec<_> = tokens
            .values()
            .filter(|t| t.user_id == user_id && t.is_live(now))
            .cloned()
            .collect();
        out.sort_by_key(|t| t.created_at);
        Ok(out)
    }

    async fn deactivate(&self, id: TokenId) -> StoreResult<bool> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        match tokens.get_mut(&id) {
            Some(t) if t.is_active => {
                t.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_all(&self, user_id: UserId) -> StoreResult<usize> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        let mut flipped = 0;
        for t in tokens.values_mut() {
            if t.user_id == user_id && t.is_active {
                t.is_active = false;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generic record table
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory table for any [`Record`].
pub struct InMemoryTable<E: Record> {
    rows: RwLock<HashMap<E::Id, E>>,
}

impl<E: Record> Default for InMemoryTable<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Record + core::fmt::Debug> core::fmt::Debug for InMemoryTable<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryTable").finish_non_exhaustive()
    }
}

impl<E: Record> InMemoryTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<E::Id, E>>> {
        self.rows.read().map_err(|_| poisoned())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<E::Id, E>>> {
        self.rows.write().map_err(|_| poisoned())
    }

    fn check_conflicts<'a>(
        rows: impl Iterator<Item = &'a E>,
        candidate: &E,
    ) -> StoreResult<()> {
        for existing in rows {
            if existing.id() == candidate.id() {
                continue;
            }
            if let Some(constraint) = candidate.conflicts_with(existing) {
                return Err(StoreError::UniqueViolation(constraint));
            }
        }
        Ok(())
    }

    fn sorted(mut rows: Vec<E>) -> Vec<E> {
        rows.sort_by_key(|r| r.audit().created_at);
        rows
    }
}

#[async_trait]
impl<E: Record> RecordStore<E> for InMemoryTable<E> {
    async fn insert(&self, record: &E) -> StoreResult<()> {
        let mut rows = self.write()?;
        if rows.contains_key(&record.id()) {
            return Err(StoreError::UniqueViolation(Constraint::PrimaryKey));
        }
        Self::check_conflicts(rows.values(), record)?;
        rows.insert(record.id(), record.clone());
        Ok(())
    }

    async fn get(&self, id: E::Id) -> StoreResult<Option<E>> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn update(&self, record: &E) -> StoreResult<()> {
        let mut rows = self.write()?;
        if !rows.contains_key(&record.id()) {
            return Err(StoreError::NotFound);
        }
        Self::check_conflicts(rows.values(), record)?;
        rows.insert(record.id(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: E::Id) -> StoreResult<bool> {
        Ok(self.write()?.remove(&id).is_some())
    }

    async fn list(&self, active_only: bool) -> StoreResult<Vec<E>> {
        let rows = self.read()?;
        let out = rows
            .values()
            .filter(|r| !active_only || r.is_active())
            .cloned()
            .collect();
        Ok(Self::sorted(out))
    }
}

#[async_trait]
impl<L: LinkRecord> LinkStore<L> for InMemoryTable<L> {
    async fn find_pair(&self, left: L::Left, right: L::Right) -> StoreResult<Vec<L>> {
        let rows = self.read()?;
        let out = rows
            .values()
            .filter(|r| r.left() == left && r.right() == right)
            .cloned()
            .collect();
        Ok(Self::sorted(out))
    }

    async fn list_for(&self, left: L::Left, active_only: bool) -> StoreResult<Vec<L>> {
        let rows = self.read()?;
        let out = rows
            .values()
            .filter(|r| r.left() == left && (!active_only || r.is_active()))
            .cloned()
            .collect();
        Ok(Self::sorted(out))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RBAC
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory roles, permissions and their links.
#[derive(Debug, Default)]
pub struct InMemoryRbacStore {
    roles: InMemoryTable<Role>,
    permissions: InMemoryTable<Permission>,
    user_roles: InMemoryTable<UserRole>,
    role_permissions: InMemoryTable<RolePermission>,
}

impl InMemoryRbacStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RbacStore for InMemoryRbacStore {
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

    async fn has_active_grant(&self, role_ids: &[RoleId], code: &str) -> StoreResult<bool> {
        let grants = self.role_permissions.read()?;
        let roles = self.roles.read()?;
        let permissions = self.permissions.read()?;

        Ok(grants.values().any(|grant| {
            grant.is_active()
                && role_ids.contains(&grant.role_id)
                && roles.get(&grant.role_id).is_some_and(|r| r.is_active())
                && permissions
                    .get(&grant.permission_id)
                    .is_some_and(|p| p.is_active() && p.code == code)
        }))
    }
}
