use axum::{Router, routing::get};

pub mod auth;
pub mod policy;
pub mod system;
pub mod users;

/// Routes reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .merge(auth::public_router())
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .merge(auth::router())
        .nest("/policy", policy::router())
        .nest("/users", users::router())
}
