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
        task_service::{
            AssignTaskRequest, AssignmentView, CommentListQuery, CommentView,
            CreateCommentRequest, CreateTaskRequest, TaskDetail, TaskListQuery, TaskService,
            TaskView, UpdateTaskRequest,
        },
    },
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    let read = Router::new()
        .route("/", get(list))
        .route("/{id}", get(detail))
        .route("/{id}/comments", get(comments))
        .route_layer(RequirePermissionsLayer::new(["task:read"]));

    let create = Router::new()
        .route("/", post(create))
        .route_layer(RequirePermissionsLayer::new(["task:create"]));

    // authorized per task against the caller's project role
    let update = Router::new().route("/{id}", put(update));

    let remove = Router::new()
        .route("/{id}", delete(remove))
        .route_layer(RequirePermissionsLayer::new(["task:delete"]));

    let assign = Router::new()
        .route("/{id}/assign", post(assign))
        .route("/{id}/assign/{user_id}", delete(unassign))
        .route_layer(RequirePermissionsLayer::new(["task:assign"]));

    let comment = Router::new()
        .route("/{id}/comments", post(add_comment))
        .route_layer(RequirePermissionsLayer::new(["comment:create"]));

    let tasks = read
        .merge(create)
        .merge(update)
        .merge(remove)
        .merge(assign)
        .merge(comment)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_organization,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new().nest("/tasks", tasks).with_state(state)
}

fn tasks(state: &AppState) -> TaskService {
    ServiceContext::from_state(state).task()
}

async fn list(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<PaginatedResponse<TaskView>> {
    let page = tasks(&state).list(&ctx, query).await?;
    JsonApiResponse::ok(page)
}

async fn create(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Json(body): Json<CreateTaskRequest>,
) -> ApiResult<TaskDetail> {
    let task = tasks(&state).create(&ctx, body).await?;
    JsonApiResponse::created("Task created successfully", task)
}

async fn detail(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
) -> ApiResult<TaskDetail> {
    let task = tasks(&state).detail(&ctx, id).await?;
    JsonApiResponse::ok(task)
}

async fn update(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTaskRequest>,
) -> ApiResult<TaskView> {
    let task = tasks(&state).update(&ctx, id, body).await?;
    JsonApiResponse::ok_with_message("Task updated successfully", task)
}

async fn remove(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    tasks(&state).delete(&ctx, id).await?;
    JsonApiResponse::message("Task deleted successfully")
}

async fn assign(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignTaskRequest>,
) -> ApiResult<AssignmentView> {
    let assignment = tasks(&state).assign(&ctx, id, body).await?;
    JsonApiResponse::created("Task assigned successfully", assignment)
}

async fn unassign(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<()> {
    tasks(&state).unassign(&ctx, id, user_id).await?;
    JsonApiResponse::message("Task unassigned successfully")
}

async fn comments(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
    Query(query): Query<CommentListQuery>,
) -> ApiResult<PaginatedResponse<CommentView>> {
    let page = tasks(&state).comments(&ctx, id, query).await?;
    JsonApiResponse::ok(page)
}

async fn add_comment(
    State(state): State<Arc<AppState>>,
    ctx: OrgContext,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<CommentView> {
    let comment = tasks(&state).add_comment(&ctx, id, body).await?;
    JsonApiResponse::created("Comment added successfully", comment)
}
