//! Access gate: bearer header → user → optional permission check.

use authgate_core::{AuthError, AuthResult};

use crate::authorize::{PermissionResolver, RequirePermission};
use crate::credentials::CredentialService;
use crate::permissions::PermissionCode;
use crate::user::User;

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// An authenticated request.
///
/// The raw token is kept so the caller can log out this exact session.
#[derive(Clone)]
pub struct Caller {
    pub user: User,
    pub token: String,
}

impl core::fmt::Debug for Caller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Caller")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    credentials: CredentialService,
    resolver: PermissionResolver,
}

impl AccessGate {
    pub fn new(credentials: CredentialService, resolver: PermissionResolver) -> Self {
        Self {
            credentials,
            resolver,
        }
    }

    pub fn credentials(&self) -> &CredentialService {
        &self.credentials
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Resolve the caller from a raw `Authorization` header value.
    pub async fn authenticate(&self, header: Option<&str>) -> AuthResult<Caller> {
        let token = header
            .and_then(extract_bearer)
            .ok_or(AuthError::MissingCredentials)?;
        let user = self.credentials.resolve_bearer(token).await?;
        Ok(Caller {
            user,
            token: token.to_string(),
        })
    }

    /// Resolve the caller, then enforce `required` if given.
    pub async fn authorize(
        &self,
        header: Option<&str>,
        required: Option<&RequirePermission>,
    ) -> AuthResult<Caller> {
        let caller = self.authenticate(header).await?;
        if let Some(guard) = required {
            guard.check(&caller.user).await?;
        }
        Ok(caller)
    }

    pub fn require_permission(&self, code: impl Into<PermissionCode>) -> RequirePermission {
        self.resolver.require(code)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};

    use authgate_core::{AuditTrail, ManualClock, Settings};

    use super::*;
    use crate::permissions::{Permission, RolePermission, codes};
    use crate::record::{CatalogRecord, LinkRecord};
    use crate::roles::{Role, UserRole};
    use crate::store::{
        InMemoryRbacStore, InMemoryTokenStore, InMemoryUserStore, RbacStore, RecordStore,
    };
    use crate::validation::RegistrationRequest;

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer("bearer   abc"), Some("abc"));
        assert_eq!(extract_bearer("Basic abc"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("abc"), None);
    }

    async fn gate_with_user() -> (AccessGate, Arc<InMemoryRbacStore>, User, String) {
        let rbac = Arc::new(InMemoryRbacStore::new());
        let credentials = CredentialService::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryTokenStore::new()),
            Arc::new(ManualClock::default()),
            &Settings::new("gate-secret"),
        );
        let user = credentials
            .register(&RegistrationRequest {
                username: "Testuser".into(),
                email: "test@x.com".into(),
                password: "Password1!".into(),
                confirm_password: "Password1!".into(),
                birthday: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            })
            .await
            .unwrap();
        let pair = credentials.issue_token_pair(&user).await.unwrap();

        let gate = AccessGate::new(credentials, PermissionResolver::new(rbac.clone()));
        (gate, rbac, user, format!("Bearer {}", pair.access_token))
    }

    #[tokio::test]
    async fn missing_or_malformed_header_is_rejected() {
        let (gate, _, _, _) = gate_with_user().await;
        assert_eq!(
            gate.authenticate(None).await.unwrap_err(),
            AuthError::MissingCredentials
        );
        assert_eq!(
            gate.authenticate(Some("Token xyz")).await.unwrap_err(),
            AuthError::MissingCredentials
        );
        assert_eq!(
            gate.authenticate(Some("Bearer xyz")).await.unwrap_err(),
            AuthError::InvalidToken
        );
    }

    #[tokio::test]
    async fn permission_is_checked_after_identity() {
        let (gate, rbac, user, header) = gate_with_user().await;
        let guard = gate.require_permission(codes::READ_ROLE);

        let caller = gate.authenticate(Some(&header)).await.unwrap();
        assert_eq!(caller.user.id, user.id);
        assert!(!format!("{caller:?}").contains(&caller.token));

        assert_eq!(
            gate.authorize(Some(&header), Some(&guard)).await.unwrap_err(),
            AuthError::PermissionDenied("read-role".into())
        );

        let audit = AuditTrail::created(user.id, Utc::now());
        let role = Role::new_entry("Reader".into(), "reader".into(), None, audit.clone());
        let perm = Permission::new_entry("Read role".into(), "read-role".into(), None, audit.clone());
        rbac.roles().insert(&role).await.unwrap();
        rbac.permissions().insert(&perm).await.unwrap();
        rbac.user_roles()
            .insert(&UserRole::new_link(user.id, role.id, audit.clone()))
            .await
            .unwrap();
        rbac.role_permissions()
            .insert(&RolePermission::new_link(role.id, perm.id, audit))
            .await
            .unwrap();

        gate.authorize(Some(&header), Some(&guard)).await.unwrap();
    }
}
