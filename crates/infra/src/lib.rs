//! Infrastructure layer: PostgreSQL adapters for the authgate store ports.

pub mod db;

pub use db::{PgStore, map_sqlx_error};
