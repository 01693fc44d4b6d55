//! Role-based access control extractors.
//!
//! Each wraps [`AuthUser`] and rejects callers without the required role
//! with 403.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fundbridge_core::error::CoreError;
use fundbridge_core::roles::Role;
use fundbridge_engine::store::FundingStore;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require_role<S: FundingStore>(
    parts: &mut Parts,
    state: &AppState<S>,
    role: Role,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if user.role != role {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "{} role required",
            role.as_str()
        ))));
    }
    Ok(user)
}

/// Requires the `admin` role.
pub struct RequireAdmin(pub AuthUser);

impl<S: FundingStore> FromRequestParts<AppState<S>> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(RequireAdmin)
    }
}

/// Requires the `volunteer` role.
pub struct RequireVolunteer(pub AuthUser);

impl<S: FundingStore> FromRequestParts<AppState<S>> for RequireVolunteer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Volunteer)
            .await
            .map(RequireVolunteer)
    }
}

/// Requires the `system` role held by payment-processor integrations.
pub struct RequireSystem(pub AuthUser);

impl<S: FundingStore> FromRequestParts<AppState<S>> for RequireSystem {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::System).await.map(RequireSystem)
    }
}
