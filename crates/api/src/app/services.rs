use std::sync::Arc;

use authgate_auth::{
    AccessGate, CredentialService, InMemoryRbacStore, InMemoryTokenStore, InMemoryUserStore,
    PermissionResolver, RbacAdmin, RbacStore, TokenStore, UserStore,
};
use authgate_core::{Clock, Settings, SystemClock};
use authgate_infra::PgStore;

/// Services shared by every handler.
#[derive(Debug, Clone)]
pub struct AppServices {
    gate: AccessGate,
    admin: RbacAdmin,
}

impl AppServices {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        rbac: Arc<dyn RbacStore>,
        clock: Arc<dyn Clock>,
        settings: &Settings,
    ) -> Self {
        let credentials = CredentialService::new(users.clone(), tokens, clock.clone(), settings);
        let resolver = PermissionResolver::new(rbac.clone());

        Self {
            gate: AccessGate::new(credentials, resolver),
            admin: RbacAdmin::new(rbac, users, clock),
        }
    }

    /// Process-local stores; state is lost on restart.
    pub fn in_memory(settings: &Settings) -> Self {
        Self::in_memory_with_clock(settings, Arc::new(SystemClock))
    }

    pub fn in_memory_with_clock(settings: &Settings, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryTokenStore::new()),
            Arc::new(InMemoryRbacStore::new()),
            clock,
            settings,
        )
    }

    /// Every port served by one Postgres store.
    pub fn persistent(store: Arc<PgStore>, settings: &Settings) -> Self {
        Self::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(SystemClock),
            settings,
        )
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn credentials(&self) -> &CredentialService {
        self.gate.credentials()
    }

    pub fn admin(&self) -> &RbacAdmin {
        &self.admin
    }
}
