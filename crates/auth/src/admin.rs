//! Role/permission administration.
//!
//! Every record here follows the same lifecycle: active → soft-deleted →
//! restored, or removed outright. Catalog names and codes stay reserved while
//! a record is soft-deleted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use authgate_core::{
    AuditTrail, AuthError, AuthResult, Clock, Entity, PermissionId, RoleId, SoftDeletable, UserId,
};

use crate::permissions::{Permission, RolePermission};
use crate::record::{CatalogRecord, CatalogUpdate, LinkRecord, Record};
use crate::roles::{Role, UserRole};
use crate::store::{LinkStore, RbacStore, RecordStore, UserStore};

/// Fields accepted when creating a role or permission.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct NewCatalogEntry {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct RbacAdmin {
    store: Arc<dyn RbacStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl core::fmt::Debug for RbacAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RbacAdmin").finish_non_exhaustive()
    }
}

impl RbacAdmin {
    pub fn new(store: Arc<dyn RbacStore>, users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            users,
            clock,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip(self, entry), fields(code = %entry.code), err)]
    pub async fn create_role(&self, entry: NewCatalogEntry, actor: UserId) -> AuthResult<Role> {
        create_entry(self.store.roles(), entry, actor, self.clock.now()).await
    }

    pub async fn get_role(&self, id: RoleId) -> AuthResult<Role> {
        active(self.store.roles(), id).await
    }

    pub async fn list_roles(&self) -> AuthResult<Vec<Role>> {
        list_catalog(self.store.roles()).await
    }

    #[instrument(skip(self, update), err)]
    pub async fn update_role(&self, id: RoleId, update: CatalogUpdate) -> AuthResult<Role> {
        update_entry(self.store.roles(), id, update).await
    }

    #[instrument(skip(self), err)]
    pub async fn soft_delete_role(&self, id: RoleId, actor: UserId) -> AuthResult<Role> {
        soft_delete(self.store.roles(), id, actor, self.clock.now()).await
    }

    #[instrument(skip(self), err)]
    pub async fn restore_role(&self, id: RoleId) -> AuthResult<Role> {
        restore(self.store.roles(), id).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete_role(&self, id: RoleId) -> AuthResult<()> {
        hard_delete(self.store.roles(), id).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Permissions
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip(self, entry), fields(code = %entry.code), err)]
    pub async fn create_permission(
        &self,
        entry: NewCatalogEntry,
        actor: UserId,
    ) -> AuthResult<Permission> {
        create_entry(self.store.permissions(), entry, actor, self.clock.now()).await
    }

    pub async fn get_permission(&self, id: PermissionId) -> AuthResult<Permission> {
        active(self.store.permissions(), id).await
    }

    pub async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        list_catalog(self.store.permissions()).await
    }

    #[instrument(skip(self, update), err)]
    pub async fn update_permission(
        &self,
        id: PermissionId,
        update: CatalogUpdate,
    ) -> AuthResult<Permission> {
        update_entry(self.store.permissions(), id, update).await
    }

    #[instrument(skip(self), err)]
    pub async fn soft_delete_permission(
        &self,
        id: PermissionId,
        actor: UserId,
    ) -> AuthResult<Permission> {
        soft_delete(self.store.permissions(), id, actor, self.clock.now()).await
    }

    #[instrument(skip(self), err)]
    pub async fn restore_permission(&self, id: PermissionId) -> AuthResult<Permission> {
        restore(self.store.permissions(), id).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete_permission(&self, id: PermissionId) -> AuthResult<()> {
        hard_delete(self.store.permissions(), id).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // User ↔ role
    // ─────────────────────────────────────────────────────────────────────

    /// Assign `role_id` to `user_id`, restoring a previously removed
    /// assignment rather than adding a second one.
    #[instrument(skip(self), err)]
    pub async fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        actor: UserId,
    ) -> AuthResult<UserRole> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::UserNotFound);
        }
        active::<Role, _>(self.store.roles(), role_id).await?;

        link(self.store.user_roles(), user_id, role_id, actor, self.clock.now()).await
    }

    pub async fn user_roles(&self, user_id: UserId) -> AuthResult<Vec<UserRole>> {
        Ok(self.store.user_roles().list_for(user_id, true).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        actor: UserId,
    ) -> AuthResult<UserRole> {
        unlink(self.store.user_roles(), user_id, role_id, actor, self.clock.now()).await
    }

    #[instrument(skip(self), err)]
    pub async fn restore_user_role(&self, user_id: UserId, role_id: RoleId) -> AuthResult<UserRole> {
        relink(self.store.user_roles(), user_id, role_id).await
    }

    #[instrument(skip(self), err)]
    pub async fn remove_user_role(&self, user_id: UserId, role_id: RoleId) -> AuthResult<()> {
        remove_links(self.store.user_roles(), user_id, role_id).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Role ↔ permission
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip(self), err)]
    pub async fn grant_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        actor: UserId,
    ) -> AuthResult<RolePermission> {
        active::<Role, _>(self.store.roles(), role_id).await?;
        active::<Permission, _>(self.store.permissions(), permission_id).await?;

        link(
            self.store.role_permissions(),
            role_id,
            permission_id,
            actor,
            self.clock.now(),
        )
        .await
    }

    pub async fn role_permissions(&self, role_id: RoleId) -> AuthResult<Vec<RolePermission>> {
        Ok(self.store.role_permissions().list_for(role_id, true).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        actor: UserId,
    ) -> AuthResult<RolePermission> {
        unlink(
            self.store.role_permissions(),
            role_id,
            permission_id,
            actor,
            self.clock.now(),
        )
        .await
    }

    #[instrument(skip(self), err)]
    pub async fn restore_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthResult<RolePermission> {
        relink(self.store.role_permissions(), role_id, permission_id).await
    }

    #[instrument(skip(self), err)]
    pub async fn remove_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AuthResult<()> {
        remove_links(self.store.role_permissions(), role_id, permission_id).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Generic lifecycle helpers
// ─────────────────────────────────────────────────────────────────────────────

fn required(field: &str, value: &str) -> AuthResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

async fn create_entry<E, S>(
    store: &S,
    entry: NewCatalogEntry,
    actor: UserId,
    now: DateTime<Utc>,
) -> AuthResult<E>
where
    E: CatalogRecord,
    S: RecordStore<E> + ?Sized,
{
    let record = E::new_entry(
        required("name", &entry.name)?,
        required("code", &entry.code)?,
        entry.description,
        AuditTrail::created(actor, now),
    );
    store.insert(&record).await?;

    info!(kind = E::KIND, code = record.code(), "created");
    Ok(record)
}

async fn active<E, S>(store: &S, id: E::Id) -> AuthResult<E>
where
    E: Record,
    S: RecordStore<E> + ?Sized,
{
    store
        .get(id)
        .await?
        .filter(|record| record.is_active())
        .ok_or(AuthError::NotFound(E::KIND))
}

async fn list_catalog<E, S>(store: &S) -> AuthResult<Vec<E>>
where
    E: CatalogRecord,
    S: RecordStore<E> + ?Sized,
{
    let mut records = store.list(true).await?;
    records.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(records)
}

async fn update_entry<E, S>(store: &S, id: E::Id, update: CatalogUpdate) -> AuthResult<E>
where
    E: CatalogRecord,
    S: RecordStore<E> + ?Sized,
{
    let update = CatalogUpdate {
        name: update.name.as_deref().map(|v| required("name", v)).transpose()?,
        code: update.code.as_deref().map(|v| required("code", v)).transpose()?,
        description: update.description,
    };

    let mut record = active(store, id).await?;
    record.apply(update);
    store.update(&record).await?;

    info!(kind = E::KIND, code = record.code(), "updated");
    Ok(record)
}

async fn soft_delete<E, S>(store: &S, id: E::Id, actor: UserId, now: DateTime<Utc>) -> AuthResult<E>
where
    E: Record,
    S: RecordStore<E> + ?Sized,
{
    let mut record = store.get(id).await?.ok_or(AuthError::NotFound(E::KIND))?;
    record.soft_delete(actor, now)?;
    store.update(&record).await?;

    info!(kind = E::KIND, id = ?id, "soft-deleted");
    Ok(record)
}

async fn restore<E, S>(store: &S, id: E::Id) -> AuthResult<E>
where
    E: Record,
    S: RecordStore<E> + ?Sized,
{
    let mut record = store.get(id).await?.ok_or(AuthError::NotFound(E::KIND))?;
    record.restore()?;
    store.update(&record).await?;

    info!(kind = E::KIND, id = ?id, "restored");
    Ok(record)
}

async fn hard_delete<E, S>(store: &S, id: E::Id) -> AuthResult<()>
where
    E: Record,
    S: RecordStore<E> + ?Sized,
{
    if !store.delete(id).await? {
        return Err(AuthError::NotFound(E::KIND));
    }
    info!(kind = E::KIND, id = ?id, "deleted");
    Ok(())
}

async fn link<L, S>(
    store: &S,
    left: L::Left,
    right: L::Right,
    actor: UserId,
    now: DateTime<Utc>,
) -> AuthResult<L>
where
    L: LinkRecord,
    S: LinkStore<L> + ?Sized,
{
    let existing = store.find_pair(left, right).await?;
    if existing.iter().any(|l| l.is_active()) {
        return Err(AuthError::AlreadyAssigned);
    }

    if let Some(mut previous) = existing.into_iter().last() {
        previous.restore()?;
        store.update(&previous).await?;
        info!(kind = L::KIND, ?left, ?right, "link restored");
        return Ok(previous);
    }

    let fresh = L::new_link(left, right, AuditTrail::created(actor, now));
    store.insert(&fresh).await?;
    info!(kind = L::KIND, ?left, ?right, "linked");
    Ok(fresh)
}

async fn unlink<L, S>(
    store: &S,
    left: L::Left,
    right: L::Right,
    actor: UserId,
    now: DateTime<Utc>,
) -> AuthResult<L>
where
    L: LinkRecord,
    S: LinkStore<L> + ?Sized,
{
    let mut current = store
        .find_pair(left, right)
        .await?
        .into_iter()
        .find(|l| l.is_active())
        .ok_or(AuthError::NotFound(L::KIND))?;

    current.soft_delete(actor, now)?;
    store.update(&current).await?;
    info!(kind = L::KIND, ?left, ?right, "unlinked");
    Ok(current)
}

/// Restore the most recent inactive link for the pair.
async fn relink<L, S>(store: &S, left: L::Left, right: L::Right) -> AuthResult<L>
where
    L: LinkRecord,
    S: LinkStore<L> + ?Sized,
{
    let mut previous = store
        .find_pair(left, right)
        .await?
        .into_iter()
        .filter(|l| !l.is_active())
        .last()
        .ok_or(AuthError::NotFound(L::KIND))?;

    previous.restore()?;
    // A second, active link for the pair surfaces here as `AlreadyAssigned`.
    store.update(&previous).await?;
    info!(kind = L::KIND, ?left, ?right, "link restored");
    Ok(previous)
}

async fn remove_links<L, S>(store: &S, left: L::Left, right: L::Right) -> AuthResult<()>
where
    L: LinkRecord,
    S: LinkStore<L> + ?Sized,
{
    let links = store.find_pair(left, right).await?;
    if links.is_empty() {
        return Err(AuthError::NotFound(L::KIND));
    }
    for l in links {
        store.delete(l.id()).await?;
    }
    info!(kind = L::KIND, ?left, ?right, "links deleted");
    Ok(())
}
