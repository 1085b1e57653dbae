//! `authgate-auth` — credential lifecycle and role-based authorization.
//!
//! This crate is decoupled from HTTP; storage is reached only through the
//! ports in [`store`].

pub mod admin;
pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod gate;
pub mod jwt;
pub mod permissions;
pub mod record;
pub mod roles;
pub mod secret;
pub mod store;
pub mod token;
pub mod user;
pub mod validation;

pub use admin::{NewCatalogEntry, RbacAdmin};
pub use authorize::{Decision, PermissionResolver, RequirePermission};
pub use claims::{TokenClaims, TokenKind, TokenValidationError, validate_claims};
pub use credentials::CredentialService;
pub use gate::{AccessGate, Caller, extract_bearer};
pub use jwt::Hs256Jwt;
pub use permissions::{Permission, PermissionCode, RolePermission, codes};
pub use record::{CatalogRecord, CatalogUpdate, Constraint, LinkRecord, Record};
pub use roles::{Role, UserRole};
pub use store::{
    InMemoryRbacStore, InMemoryTokenStore, InMemoryUserStore, LinkStore, RbacStore, RecordStore,
    StoreError, StoreResult, TokenStore, UserStore,
};
pub use token::{TokenInfo, TokenPair, TokenRecord};
pub use user::User;
pub use validation::{LoginRequest, RegistrationRequest};
