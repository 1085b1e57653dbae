//! Persistence boundary for users, tokens and RBAC records.
//!
//! The traits describe set operations only; every policy decision lives in
//! the services. `authgate-infra` provides the PostgreSQL implementation.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryRbacStore, InMemoryTable, InMemoryTokenStore, InMemoryUserStore};
pub use r#trait::{
    LinkStore, RbacStore, RecordStore, StoreError, StoreResult, TokenStore, UserStore,
};
