use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware,
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    auth::OrgContext,
    db::dao::PaginatedResponse,
    middleware::{RequirePermissionsLayer, authenticate, require_organization},
    response::{ApiResult, JsonApiResponse},
    services::{
        ServiceContext,
        project_service::{
            AddMemberRequest, BoardView, CreateProjectRequest, CreatedProject, ProjectDetail,
            ProjectListQuery, ProjectMemberView, ProjectService, ProjectView, UpdateMemberRoleRequest,
            UpdateProjectRequest,
        },
    },
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    let read = Router::new()
        .route("/", get(list))
        .route("/{id}", get(detail))
        .route("/{id}/members", get(members))
        .route("/{id}/boards", get(boards))
        .route_layer(RequirePermissionsLayer::new(["project:read"]));

    let create = Router::new()
        .route("/", post(create))
        .route_layer(RequirePermissionsLayer::new(["project:create"]));

    let update = Router::new()
        .route("/{id}", put(update))
        .route_layer(RequirePermissionsLayer::new(["project:update"]));

    let remove = Router::new()
        .route("/{id}", delete(remove))
        .route_layer(RequirePermissionsLayer::new(["project:delete"]));

    let manage = Router::new()
        .route("/{id}/members", post(add_member))
        .route("/{id}/members/{user_id}", delete(remove_member))
        .route("/{id}/members/{user_id}/role", put(update_member_role))
        .route_layer(RequirePermissionsLayer::new(["project:manage"]));

    let projects = read
        .merge(create)
        .merge(update)
        .merge(remove)
        .merge(manage)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_organization,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new().nest("/projects", projects).with_state(state)
}

fn projects(state: &AppState) -> ProjectService {
    ServiceContext::from_state(state).project()
}

async fn list(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<PaginatedResponse<ProjectView>> {
    let page = projects(&state).list(&ctx, query).await?;
    JsonApiResponse::ok(page)
}

async fn create(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Json(body): Json<CreateProjectRequest>,
) -> ApiResult<CreatedProject> {
    let project = projects(&state).create(&ctx, body).await?;
    JsonApiResponse::created("Project created successfully", project)
}

async fn detail(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
) -> ApiResult<ProjectDetail> {
    let project = projects(&state).detail(&ctx, id).await?;
    JsonApiResponse::ok(project)
}

async fn update(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProjectRequest>,
) -> ApiResult<ProjectView> {
    let project = projects(&state).update(&ctx, id, body).await?;
    JsonApiResponse::ok_with_message("Project updated successfully", project)
}

async fn remove(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    projects(&state).delete(&ctx, id).await?;
    JsonApiResponse::message("Project deleted successfully")
}

async fn members(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<ProjectMemberView>> {
    let members = projects(&state).members(&ctx, id).await?;
    JsonApiResponse::ok(members)
}

async fn add_member(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> ApiResult<ProjectMemberView> {
    let member = projects(&state).add_member(&ctx, id, body).await?;
    JsonApiResponse::created("Member added to project successfully", member)
}

async fn remove_member(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    projects(&state).remove_member(&ctx, id, user_id).await?;
    JsonApiResponse::message("Member removed from project successfully")
}

async fn update_member_role(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateMemberRoleRequest>,
) -> ApiResult<ProjectMemberView> {
    let member = projects(&state)
        .update_member_role(&ctx, id, user_id, body)
        .await?;
    JsonApiResponse::ok_with_message("Member role updated successfully", member)
}

async fn boards(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<BoardView>> {
    let boards = projects(&state).boards(&ctx, id).await?;
    JsonApiResponse::ok(boards)
}
