use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    auth::{AuthUser, OrgContext},
    error::AppError,
    services::{ServiceContext, auth_service::ORGANIZATION_REQUIRED},
    state::AppState,
};

pub const ACCESS_TOKEN_REQUIRED: &str = "Access token required";

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Verifies the bearer access token and attaches the caller as [`AuthUser`].
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::unauthorized(ACCESS_TOKEN_REQUIRED))?;

    let user = ServiceContext::from_state(&state)
        .auth(&state.tokens)
        .authenticate(token)
        .await?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Must run after [`authenticate`]. Resolves the token's organization claim
/// against an active membership and attaches an [`OrgContext`].
pub async fn require_organization(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::unauthorized(ACCESS_TOKEN_REQUIRED))?;

    let ctx = ServiceContext::from_state(&state)
        .auth(&state.tokens)
        .organization_context(user)
        .await?;

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

/// Like [`authenticate`], but any failure leaves the request anonymous.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        let resolved = ServiceContext::from_state(&state)
            .auth(&state.tokens)
            .authenticate(token)
            .await;
        match resolved {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(err) => tracing::debug!(error = %err, "optional auth fell back to anonymous"),
        }
    }
    next.run(req).await
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized(ACCESS_TOKEN_REQUIRED))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}

impl<S> FromRequestParts<S> for OrgContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<OrgContext>()
            .cloned()
            .ok_or_else(|| AppError::forbidden(ORGANIZATION_REQUIRED))
    }
}
