//! API-side permission guard.
//!
//! Handlers call this after the bearer middleware has resolved the caller and
//! before they touch the admin services.

use authgate_auth::{Caller, PermissionCode};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// Require `code` for the current caller.
pub async fn require(
    services: &AppServices,
    caller: &Caller,
    code: PermissionCode,
) -> Result<(), ApiError> {
    services
        .gate()
        .require_permission(code)
        .check(&caller.user)
        .await?;
    Ok(())
}
