use std::{
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::{auth::AuthUser, error::AppError, middleware::auth::ACCESS_TOKEN_REQUIRED};

pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

/// Route gate: every listed `resource:action` string must be granted by the
/// caller's token permissions. Expects [`AuthUser`] in the extensions, so it
/// goes inside the authentication layer.
#[derive(Clone)]
pub struct RequirePermissionsLayer {
    required: Arc<[String]>,
}

impl RequirePermissionsLayer {
    pub fn new<I, P>(required: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            required: required.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone)]
pub struct RequirePermissions<S> {
    inner: S,
    required: Arc<[String]>,
}

impl<S> Layer<S> for RequirePermissionsLayer {
    type Service = RequirePermissions<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissions {
            inner,
            required: self.required.clone(),
        }
    }
}

impl<S> Service<Request<Body>> for RequirePermissions<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let required = self.required.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let user = match req.extensions().get::<AuthUser>() {
                Some(user) => user,
                None => {
                    return Ok(AppError::unauthorized(ACCESS_TOKEN_REQUIRED).into_response());
                }
            };

            if let Some(missing) = required.iter().find(|p| !user.grants(p)) {
                tracing::debug!(
                    user_id = %user.id,
                    permission = %missing,
                    "permission gate denied request"
                );
                return Ok(AppError::forbidden(INSUFFICIENT_PERMISSIONS).into_response());
            }

            inner.call(req).await
        })
    }
}
