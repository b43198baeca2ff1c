//! Bearer Authentication

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use enroll_core::{CurrentUser, EnrollError};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, resolved through the identity provider
#[derive(Clone, Debug)]
pub struct AuthUser(pub CurrentUser);

fn bearer_token(parts: &Parts) -> Result<&str, EnrollError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| EnrollError::Unauthenticated("missing Authorization header".into()))?
        .to_str()
        .map_err(|_| EnrollError::Unauthenticated("invalid Authorization header".into()))?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| EnrollError::Unauthenticated("expected a Bearer token".into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let user = state.identity.current_user(token).await?;
        Ok(Self(user))
    }
}
