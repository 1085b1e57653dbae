//! HTTP API: routing, bearer authentication and error mapping.

pub mod app;
pub mod authz;
pub mod middleware;
