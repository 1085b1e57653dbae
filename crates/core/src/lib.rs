//! `authgate-core` — foundation building blocks shared by every authgate crate.
//!
//! This crate contains **pure** primitives (no storage, no transport).

pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, Settings};
pub use entity::{AuditTrail, Entity, SoftDeletable};
pub use error::{AuthError, AuthResult};
pub use id::{PermissionId, RoleId, RolePermissionId, TokenId, UserId, UserRoleId};
