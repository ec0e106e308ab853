use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    middleware,
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, OrgContext},
    middleware::{authenticate, require_organization},
    response::{ApiResult, JsonApiResponse},
    services::{
        ServiceContext,
        organization_service::{OrganizationMemberView, OrganizationSummary, OrganizationView},
    },
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    let scoped = Router::new()
        .route("/{id}", get(detail))
        .route("/{id}/members", get(members))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_organization,
        ));

    let organizations = Router::new()
        .route("/", get(mine))
        .merge(scoped)
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .nest("/organizations", organizations)
        .with_state(state)
}

async fn mine(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Vec<OrganizationSummary>> {
    let organizations = ServiceContext::from_state(&state)
        .organization()
        .my_organizations(user.id)
        .await?;
    JsonApiResponse::ok(organizations)
}

async fn detail(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
) -> ApiResult<OrganizationView> {
    let organization = ServiceContext::from_state(&state)
        .organization()
        .detail(&ctx, id)
        .await?;
    JsonApiResponse::ok(organization)
}

async fn members(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<OrganizationMemberView>> {
    let members = ServiceContext::from_state(&state)
        .organization()
        .members(&ctx, id)
        .await?;
    JsonApiResponse::ok(members)
}
