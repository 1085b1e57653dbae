use axum::{
    extract::State,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use authgate_auth::AccessGate;

use crate::app::errors::ApiError;

/// Resolve `Authorization: Bearer <token>` and store the [`authgate_auth::Caller`]
/// in request extensions.
pub async fn auth_middleware(
    State(gate): State<AccessGate>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let caller = gate.authenticate(header.as_deref()).await?;
    tracing::debug!(user_id = %caller.user.id, "caller resolved");

    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}
