use std::collections::{HashMap, HashSet};

use sea_orm::{Set, TransactionTrait, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{Action, OrgContext, PermissionContext, ProjectRole, Resource, has_permission},
    db::dao::{
        DaoBase, DaoContext, DaoLayerError, PaginatedResponse, TaskAssignmentDao, TaskDao,
        task_dao::{TaskListFilter, new_task},
    },
    db::entities::{
        comment,
        project::Priority,
        task::{self, TaskStatus},
        task_assignment::{self, AssignmentRole},
        user,
    },
    error::{AppError, FieldError, validate_with},
    services::{pagination::PageParams, user_service::UserSummary},
};

pub const PROJECT_ACCESS_DENIED: &str = "Project not found or access denied";
pub const TASK_ACCESS_DENIED: &str = "Task not found or access denied";
const DEFAULT_PAGE_SIZE: u64 = 50;
const COMMENT_PAGE_SIZE: u64 = 20;

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    #[serde(rename = "projectId")]
    pub project_id: Option<Uuid>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "assignedTo")]
    pub assigned_to: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[serde(rename = "projectId")]
    pub project_id: Uuid,
    #[serde(rename = "parentId")]
    pub parent_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200, message = "Task title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTimeWithTimeZone>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<DateTimeWithTimeZone>,
    #[serde(rename = "estimatedHours")]
    #[validate(range(min = 0.0, message = "Estimated hours must be a positive number"))]
    pub estimated_hours: Option<f64>,
    pub tags: Option<Vec<String>>,
    #[serde(rename = "assignedUserIds", default)]
    pub assigned_user_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Task title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTimeWithTimeZone>,
    #[serde(rename = "dueDate")]
    pub due_date: Option<DateTimeWithTimeZone>,
    #[serde(rename = "estimatedHours")]
    #[validate(range(min = 0.0, message = "Estimated hours must be a positive number"))]
    pub estimated_hours: Option<f64>,
    #[serde(rename = "actualHours")]
    #[validate(range(min = 0.0, message = "Actual hours must be a positive number"))]
    pub actual_hours: Option<f64>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AssignTaskRequest {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub content: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub due_date: Option<DateTimeWithTimeZone>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub tags: serde_json::Value,
    pub created_by_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<task::Model> for TaskView {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            parent_id: model.parent_id,
            title: model.title,
            description: model.description,
            status: model.status,
            priority: model.priority,
            start_date: model.start_date,
            due_date: model.due_date,
            estimated_hours: model.estimated_hours,
            actual_hours: model.actual_hours,
            tags: model.tags,
            created_by_id: model.created_by_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub assigned_at: DateTimeWithTimeZone,
    pub user: Option<UserSummary>,
}

impl AssignmentView {
    fn new(assignment: task_assignment::Model, user: Option<&user::Model>) -> Self {
        Self {
            id: assignment.id,
            user_id: assignment.user_id,
            role: assignment.role,
            assigned_at: assignment.created_at,
            user: user.map(UserSummary::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: TaskView,
    pub assignments: Vec<AssignmentView>,
    pub subtasks: Vec<TaskView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub task_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub author: Option<UserSummary>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl CommentView {
    fn new(comment: comment::Model, author: Option<&user::Model>) -> Self {
        Self {
            id: comment.id,
            task_id: comment.task_id,
            parent_id: comment.parent_id,
            content: comment.content,
            author: author.map(UserSummary::from),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

/// A task the caller may see, with the caller's role in its project.
struct VisibleTask {
    task: task::Model,
    project_role: ProjectRole,
}

#[derive(Clone)]
pub struct TaskService {
    daos: DaoContext,
}

impl TaskService {
    pub fn new(daos: DaoContext) -> Self {
        Self { daos }
    }

    /// Without `projectId` the listing covers every project of the working
    /// organization the caller is a member of.
    pub async fn list(
        &self,
        ctx: &OrgContext,
        query: TaskListQuery,
    ) -> Result<PaginatedResponse<TaskView>, AppError> {
        let (page, page_size) =
            PageParams::new(query.page, query.limit).resolve(DEFAULT_PAGE_SIZE)?;
        let mut errors = status_errors(query.status.as_deref());
        errors.extend(priority_errors(query.priority.as_deref()));
        if !errors.is_empty() {
            return Err(AppError::validation(errors));
        }

        let project_ids = match query.project_id {
            Some(project_id) => {
                self.daos
                    .project()
                    .find_in_org(project_id, ctx.organization_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(PROJECT_ACCESS_DENIED))?;
                vec![project_id]
            }
            None => {
                let member_of = self
                    .daos
                    .project_member()
                    .project_ids_for_user(ctx.user_id())
                    .await?;
                self.daos
                    .project()
                    .ids_in_org(member_of, ctx.organization_id)
                    .await?
            }
        };
        if project_ids.is_empty() {
            return Ok(empty_page(page, page_size));
        }

        let task_ids = match query.assigned_to {
            Some(user_id) => {
                let ids = self.daos.task_assignment().task_ids_for_user(user_id).await?;
                if ids.is_empty() {
                    return Ok(empty_page(page, page_size));
                }
                Some(ids)
            }
            None => None,
        };

        let filter = TaskListFilter {
            project_ids,
            task_ids,
            status: query.status,
            priority: query.priority,
            search: query.search.map(|s| s.trim().to_string()),
        };
        let tasks = self.daos.task().list(filter, page, page_size).await?;
        Ok(tasks.map(TaskView::from))
    }

    /// Inserts the task and its assignee rows in one transaction.
    pub async fn create(
        &self,
        ctx: &OrgContext,
        body: CreateTaskRequest,
    ) -> Result<TaskDetail, AppError> {
        validate_with(&body, priority_errors(body.priority.as_deref()))?;

        let project = self
            .daos
            .project()
            .find_in_org(body.project_id, ctx.organization_id)
            .await?
            .ok_or_else(|| AppError::not_found(PROJECT_ACCESS_DENIED))?;
        let members: HashSet<Uuid> = self
            .daos
            .project_member()
            .list_for_project(project.id)
            .await?
            .into_iter()
            .map(|member| member.user_id)
            .collect();
        if !members.contains(&ctx.user_id()) {
            return Err(AppError::not_found(PROJECT_ACCESS_DENIED));
        }

        if let Some(parent_id) = body.parent_id {
            self.daos
                .task()
                .find_in_project(parent_id, project.id)
                .await?
                .ok_or_else(|| AppError::not_found("Parent task not found"))?;
        }

        let mut assignees = body.assigned_user_ids.clone();
        assignees.sort();
        assignees.dedup();
        if assignees.iter().any(|id| !members.contains(id)) {
            return Err(AppError::bad_request(
                "Some assigned users are not project members",
            ));
        }

        let mut active = new_task(
            project.id,
            body.parent_id,
            body.title.trim().to_string(),
            ctx.user_id(),
        );
        active.description = Set(body.description);
        if let Some(priority) = body.priority {
            active.priority = Set(priority);
        }
        active.start_date = Set(body.start_date);
        active.due_date = Set(body.due_date);
        active.estimated_hours = Set(body.estimated_hours);
        if let Some(tags) = body.tags {
            active.tags = Set(serde_json::json!(tags));
        }

        let txn = self.daos.db().begin().await?;
        let task = TaskDao::create_with(&txn, active).await?;
        let mut assignments = Vec::with_capacity(assignees.len());
        for user_id in &assignees {
            assignments.push(
                TaskAssignmentDao::assign_with(&txn, task.id, *user_id, AssignmentRole::Assignee)
                    .await?,
            );
        }
        txn.commit().await?;

        tracing::info!(
            task_id = %task.id,
            project_id = %project.id,
            assignees = assignments.len(),
            "task created"
        );

        let assignments = self.assignment_views(assignments).await?;
        Ok(TaskDetail {
            task: task.into(),
            assignments,
            subtasks: Vec::new(),
        })
    }

    pub async fn detail(&self, ctx: &OrgContext, id: Uuid) -> Result<TaskDetail, AppError> {
        let VisibleTask { task, .. } = self.visible_task(ctx, id).await?;
        let assignments = self.daos.task_assignment().list_for_task(task.id).await?;
        let assignments = self.assignment_views(assignments).await?;
        let subtasks = self.daos.task().subtasks(task.id).await?;

        Ok(TaskDetail {
            task: task.into(),
            assignments,
            subtasks: subtasks.into_iter().map(TaskView::from).collect(),
        })
    }

    /// Authorized against the caller's role permissions with the task's
    /// facts: whether the caller is assigned and their project role.
    pub async fn update(
        &self,
        ctx: &OrgContext,
        id: Uuid,
        body: UpdateTaskRequest,
    ) -> Result<TaskView, AppError> {
        let mut extra = status_errors(body.status.as_deref());
        extra.extend(priority_errors(body.priority.as_deref()));
        validate_with(&body, extra)?;

        let VisibleTask { task, project_role } = self.visible_task(ctx, id).await?;
        let assigned_to_self = self
            .daos
            .task_assignment()
            .find_assignment(task.id, ctx.user_id())
            .await?
            .is_some();
        let facts = PermissionContext {
            assigned_to_self: Some(assigned_to_self),
            project_role: Some(project_role),
        };
        if !has_permission(&ctx.role_permissions, Resource::Task, Action::Update, Some(&facts)) {
            return Err(AppError::forbidden("Insufficient permissions to update task"));
        }

        let updated = self
            .daos
            .task()
            .update(task.id, move |active| {
                if let Some(title) = body.title {
                    active.title = Set(title.trim().to_string());
                }
                if let Some(description) = body.description {
                    active.description = Set(Some(description));
                }
                if let Some(status) = body.status {
                    active.status = Set(status);
                }
                if let Some(priority) = body.priority {
                    active.priority = Set(priority);
                }
                if let Some(start_date) = body.start_date {
                    active.start_date = Set(Some(start_date));
                }
                if let Some(due_date) = body.due_date {
                    active.due_date = Set(Some(due_date));
                }
                if let Some(hours) = body.estimated_hours {
                    active.estimated_hours = Set(Some(hours));
                }
                if let Some(hours) = body.actual_hours {
                    active.actual_hours = Set(Some(hours));
                }
                if let Some(tags) = body.tags {
                    active.tags = Set(serde_json::json!(tags));
                }
            })
            .await?;

        tracing::info!(task_id = %updated.id, status = %updated.status, "task updated");
        Ok(updated.into())
    }

    pub async fn delete(&self, ctx: &OrgContext, id: Uuid) -> Result<(), AppError> {
        let VisibleTask { task, project_role } = self.visible_task(ctx, id).await?;
        if !project_role.can_manage() {
            return Err(AppError::not_found(
                "Task not found or insufficient permissions",
            ));
        }
        if self.daos.task().has_subtasks(task.id).await? {
            return Err(AppError::bad_request("Cannot delete task with subtasks"));
        }

        self.daos.task().delete(task.id).await?;
        tracing::info!(task_id = %task.id, "task deleted");
        Ok(())
    }

    pub async fn assign(
        &self,
        ctx: &OrgContext,
        id: Uuid,
        body: AssignTaskRequest,
    ) -> Result<AssignmentView, AppError> {
        let role = match body.role.as_deref() {
            None => AssignmentRole::Assignee,
            Some(role) => AssignmentRole::try_from(role)
                .map_err(|_| AppError::invalid_field("role", AssignmentRole::INVALID))?,
        };

        let VisibleTask { task, .. } = self.visible_task(ctx, id).await?;
        if self
            .daos
            .project_member()
            .find_member(task.project_id, body.user_id)
            .await?
            .is_none()
        {
            return Err(AppError::bad_request("User is not a member of this project"));
        }
        if self
            .daos
            .task_assignment()
            .find_assignment(task.id, body.user_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("User is already assigned to this task"));
        }

        let assignment =
            TaskAssignmentDao::assign_with(self.daos.db(), task.id, body.user_id, role).await?;
        let user = self.daos.user().find_optional(body.user_id).await?;

        tracing::info!(task_id = %task.id, user_id = %body.user_id, "task assigned");
        Ok(AssignmentView::new(assignment, user.as_ref()))
    }

    pub async fn unassign(&self, ctx: &OrgContext, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let VisibleTask { task, .. } = self.visible_task(ctx, id).await?;
        let removed = self.daos.task_assignment().unassign(task.id, user_id).await?;
        if removed == 0 {
            return Err(AppError::not_found("User is not assigned to this task"));
        }

        tracing::info!(task_id = %task.id, user_id = %user_id, "task unassigned");
        Ok(())
    }

    pub async fn comments(
        &self,
        ctx: &OrgContext,
        id: Uuid,
        query: CommentListQuery,
    ) -> Result<PaginatedResponse<CommentView>, AppError> {
        let (page, page_size) =
            PageParams::new(query.page, query.limit).resolve(COMMENT_PAGE_SIZE)?;
        let VisibleTask { task, .. } = self.visible_task(ctx, id).await?;

        let comments = self
            .daos
            .comment()
            .page_for_task(task.id, page, page_size)
            .await?;
        let authors = self
            .users_by_id(comments.data.iter().map(|c| c.author_id).collect())
            .await?;

        Ok(comments.map(|comment| {
            let author = authors.get(&comment.author_id);
            CommentView::new(comment, author)
        }))
    }

    pub async fn add_comment(
        &self,
        ctx: &OrgContext,
        id: Uuid,
        body: CreateCommentRequest,
    ) -> Result<CommentView, AppError> {
        validate_with(&body, Vec::new())?;
        let VisibleTask { task, .. } = self.visible_task(ctx, id).await?;

        if let Some(parent_id) = body.parent_id {
            self.daos
                .comment()
                .find_in_task(parent_id, task.id)
                .await?
                .ok_or_else(|| AppError::not_found("Parent comment not found"))?;
        }

        let comment = self
            .daos
            .comment()
            .add(task.id, ctx.user_id(), body.parent_id, body.content)
            .await?;
        let author = self.daos.user().find_optional(ctx.user_id()).await?;

        tracing::info!(task_id = %task.id, comment_id = %comment.id, "comment added");
        Ok(CommentView::new(comment, author.as_ref()))
    }

    /// The task, provided its project is in the working organization and the
    /// caller is a member of it. Anything else reads as not found.
    async fn visible_task(&self, ctx: &OrgContext, id: Uuid) -> Result<VisibleTask, AppError> {
        let task = match self.daos.task().find_by_id(id).await {
            Ok(task) => task,
            Err(DaoLayerError::NotFound { .. }) => {
                return Err(AppError::not_found(TASK_ACCESS_DENIED));
            }
            Err(err) => return Err(err.into()),
        };
        self.daos
            .project()
            .find_in_org(task.project_id, ctx.organization_id)
            .await?
            .ok_or_else(|| AppError::not_found(TASK_ACCESS_DENIED))?;
        let member = self
            .daos
            .project_member()
            .find_member(task.project_id, ctx.user_id())
            .await?
            .ok_or_else(|| AppError::not_found(TASK_ACCESS_DENIED))?;

        Ok(VisibleTask {
            project_role: member.project_role(),
            task,
        })
    }

    async fn users_by_id(&self, ids: Vec<Uuid>) -> Result<HashMap<Uuid, user::Model>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .daos
            .user()
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect())
    }

    async fn assignment_views(
        &self,
        assignments: Vec<task_assignment::Model>,
    ) -> Result<Vec<AssignmentView>, AppError> {
        let users = self
            .users_by_id(assignments.iter().map(|a| a.user_id).collect())
            .await?;
        Ok(assignments
            .into_iter()
            .map(|assignment| {
                let user = users.get(&assignment.user_id);
                AssignmentView::new(assignment, user)
            })
            .collect())
    }
}

fn empty_page<T>(page: u64, page_size: u64) -> PaginatedResponse<T> {
    PaginatedResponse {
        data: Vec::new(),
        page,
        page_size,
        has_next: false,
    }
}

fn status_errors(status: Option<&str>) -> Vec<FieldError> {
    match status {
        Some(status) if TaskStatus::try_from(status).is_err() => {
            vec![FieldError::new("status", TaskStatus::INVALID)]
        }
        _ => Vec::new(),
    }
}

fn priority_errors(priority: Option<&str>) -> Vec<FieldError> {
    match priority {
        Some(priority) if Priority::try_from(priority).is_err() => {
            vec![FieldError::new("priority", Priority::INVALID)]
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::*;
    use crate::auth::SystemRole;
    use crate::db::entities::{comment, project, project_member};
    use crate::test_helpers::fixtures;

    fn service(db: &DatabaseConnection) -> TaskService {
        TaskService::new(DaoContext::new(db))
    }

    fn ctx_as(system_role: SystemRole) -> OrgContext {
        fixtures::org_context(Uuid::new_v4(), Uuid::new_v4(), system_role)
    }

    /// Mock rows for a successful `visible_task` lookup.
    fn visible(
        mock: MockDatabase,
        ctx: &OrgContext,
        task: &task::Model,
        role: ProjectRole,
    ) -> MockDatabase {
        let mut project = fixtures::project(ctx.organization_id, "Apollo");
        project.id = task.project_id;
        mock.append_query_results([[task.clone()]])
            .append_query_results([[project]])
            .append_query_results([[fixtures::project_member(
                task.project_id,
                ctx.user_id(),
                role,
            )]])
    }

    #[tokio::test]
    async fn list_without_memberships_is_empty_and_skips_task_query() {
        let ctx = ctx_as(SystemRole::TeamMember);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<project_member::Model>::new()])
            .into_connection();

        let page = service(&db)
            .list(&ctx, TaskListQuery::default())
            .await
            .expect("list should succeed");
        assert!(page.data.is_empty());
        assert_eq!(page.page_size, 50);
        assert_eq!(db.into_transaction_log().len(), 1);
    }

    #[tokio::test]
    async fn list_for_foreign_project_is_not_found() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<project::Model>::new()])
            .into_connection();

        let err = service(&db)
            .list(
                &ctx,
                TaskListQuery {
                    project_id: Some(Uuid::new_v4()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("foreign project");
        assert!(matches!(err, AppError::NotFound(ref m) if m == PROJECT_ACCESS_DENIED));
    }

    #[tokio::test]
    async fn list_rejects_unknown_filters() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = service(&db)
            .list(
                &ctx_as(SystemRole::Viewer),
                TaskListQuery {
                    status: Some("later".to_string()),
                    priority: Some("meh".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("bad filters");
        assert_eq!(err.field_errors().len(), 2);
    }

    #[tokio::test]
    async fn create_requires_assignees_to_be_project_members() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let project = fixtures::project(ctx.organization_id, "Apollo");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[project.clone()]])
            .append_query_results([[fixtures::project_member(
                project.id,
                ctx.user_id(),
                ProjectRole::Admin,
            )]])
            .into_connection();

        let err = service(&db)
            .create(
                &ctx,
                CreateTaskRequest {
                    project_id: project.id,
                    title: "Write docs".to_string(),
                    assigned_user_ids: vec![Uuid::new_v4()],
                    ..Default::default()
                },
            )
            .await
            .expect_err("outsider assignee");
        assert!(
            matches!(err, AppError::BadRequest(ref m) if m == "Some assigned users are not project members")
        );
    }

    #[tokio::test]
    async fn create_by_non_member_is_not_found() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let project = fixtures::project(ctx.organization_id, "Apollo");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[project.clone()]])
            .append_query_results([Vec::<project_member::Model>::new()])
            .into_connection();

        let err = service(&db)
            .create(
                &ctx,
                CreateTaskRequest {
                    project_id: project.id,
                    title: "Write docs".to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect_err("not a member");
        assert!(matches!(err, AppError::NotFound(ref m) if m == PROJECT_ACCESS_DENIED));
    }

    #[tokio::test]
    async fn create_inserts_task_and_assignments() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let project = fixtures::project(ctx.organization_id, "Apollo");
        let teammate = fixtures::user("grace@example.com");
        let task = fixtures::task(project.id, "Write docs", ctx.user_id());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[project.clone()]])
            .append_query_results([vec![
                fixtures::project_member(project.id, ctx.user_id(), ProjectRole::Admin),
                fixtures::project_member(project.id, teammate.id, ProjectRole::Member),
            ]])
            .append_query_results([[task.clone()]])
            .append_query_results([[fixtures::assignment(task.id, teammate.id)]])
            .append_query_results([[teammate.clone()]])
            .into_connection();

        let detail = service(&db)
            .create(
                &ctx,
                CreateTaskRequest {
                    project_id: project.id,
                    title: "Write docs".to_string(),
                    priority: Some("high".to_string()),
                    assigned_user_ids: vec![teammate.id, teammate.id],
                    ..Default::default()
                },
            )
            .await
            .expect("create should succeed");

        assert_eq!(detail.task.id, task.id);
        assert_eq!(detail.assignments.len(), 1);
        assert_eq!(
            detail.assignments[0].user.as_ref().map(|u| u.first_name.as_str()),
            Some("Ada")
        );
        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("high"));
    }

    #[tokio::test]
    async fn task_outside_membership_reads_as_not_found() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let task = fixtures::task(Uuid::new_v4(), "Hidden", Uuid::new_v4());
        let mut project = fixtures::project(ctx.organization_id, "Apollo");
        project.id = task.project_id;
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[task.clone()]])
            .append_query_results([[project]])
            .append_query_results([Vec::<project_member::Model>::new()])
            .into_connection();

        let err = service(&db)
            .detail(&ctx, task.id)
            .await
            .expect_err("not a member");
        assert!(matches!(err, AppError::NotFound(ref m) if m == TASK_ACCESS_DENIED));
    }

    #[tokio::test]
    async fn team_member_updates_only_assigned_tasks() {
        let ctx = ctx_as(SystemRole::TeamMember);
        let task = fixtures::task(Uuid::new_v4(), "Mine?", Uuid::new_v4());
        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Member,
        )
        .append_query_results([Vec::<task_assignment::Model>::new()])
        .into_connection();

        let err = service(&db)
            .update(
                &ctx,
                task.id,
                UpdateTaskRequest {
                    status: Some("done".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect_err("not assigned");
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn team_member_updates_assigned_task() {
        let ctx = ctx_as(SystemRole::TeamMember);
        let task = fixtures::task(Uuid::new_v4(), "Mine", Uuid::new_v4());
        let mut done = task.clone();
        done.status = TaskStatus::Done.as_str().to_string();
        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Member,
        )
        .append_query_results([[fixtures::assignment(task.id, ctx.user_id())]])
        .append_query_results([[task.clone()], [done]])
        .into_connection();

        let view = service(&db)
            .update(
                &ctx,
                task.id,
                UpdateTaskRequest {
                    status: Some("done".to_string()),
                    ..Default::default()
                },
            )
            .await
            .expect("assignee may update");
        assert_eq!(view.status, "done");
    }

    #[tokio::test]
    async fn delete_needs_manager_role_and_no_subtasks() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let task = fixtures::task(Uuid::new_v4(), "Parent", Uuid::new_v4());
        let service_db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Member,
        )
        .into_connection();
        let err = service(&service_db)
            .delete(&ctx, task.id)
            .await
            .expect_err("member cannot delete");
        assert!(matches!(err, AppError::NotFound(_)));

        let child = fixtures::task(task.project_id, "Child", Uuid::new_v4());
        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Manager,
        )
        .append_query_results([[child]])
        .into_connection();
        let err = service(&db)
            .delete(&ctx, task.id)
            .await
            .expect_err("has subtasks");
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Cannot delete task with subtasks"));
    }

    #[tokio::test]
    async fn assign_rejects_duplicates_and_outsiders() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let task = fixtures::task(Uuid::new_v4(), "Shared", Uuid::new_v4());
        let teammate = Uuid::new_v4();

        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Admin,
        )
        .append_query_results([Vec::<project_member::Model>::new()])
        .into_connection();
        let err = service(&db)
            .assign(
                &ctx,
                task.id,
                AssignTaskRequest {
                    user_id: teammate,
                    role: None,
                },
            )
            .await
            .expect_err("not a project member");
        assert!(matches!(err, AppError::BadRequest(_)));

        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Admin,
        )
        .append_query_results([[fixtures::project_member(
            task.project_id,
            teammate,
            ProjectRole::Member,
        )]])
        .append_query_results([[fixtures::assignment(task.id, teammate)]])
        .into_connection();
        let err = service(&db)
            .assign(
                &ctx,
                task.id,
                AssignTaskRequest {
                    user_id: teammate,
                    role: Some("reviewer".to_string()),
                },
            )
            .await
            .expect_err("already assigned");
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn assign_surfaces_user_lookup_failure() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let task = fixtures::task(Uuid::new_v4(), "Shared", Uuid::new_v4());
        let teammate = Uuid::new_v4();
        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Admin,
        )
        .append_query_results([[fixtures::project_member(
            task.project_id,
            teammate,
            ProjectRole::Member,
        )]])
        .append_query_results([Vec::<task_assignment::Model>::new()])
        .append_query_results([[fixtures::assignment(task.id, teammate)]])
        .append_query_errors([DbErr::Custom("connection reset".to_string())])
        .into_connection();

        let err = service(&db)
            .assign(
                &ctx,
                task.id,
                AssignTaskRequest {
                    user_id: teammate,
                    role: None,
                },
            )
            .await
            .expect_err("lookup failure propagates");
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn unassign_missing_assignment_is_not_found() {
        let ctx = ctx_as(SystemRole::ProjectManager);
        let task = fixtures::task(Uuid::new_v4(), "Shared", Uuid::new_v4());
        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Admin,
        )
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 0,
        }])
        .into_connection();

        let err = service(&db)
            .unassign(&ctx, task.id, Uuid::new_v4())
            .await
            .expect_err("nothing to remove");
        assert!(matches!(err, AppError::NotFound(ref m) if m == "User is not assigned to this task"));
    }

    #[tokio::test]
    async fn reply_needs_parent_on_same_task() {
        let ctx = ctx_as(SystemRole::TeamMember);
        let task = fixtures::task(Uuid::new_v4(), "Discuss", Uuid::new_v4());
        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Member,
        )
        .append_query_results([Vec::<comment::Model>::new()])
        .into_connection();

        let err = service(&db)
            .add_comment(
                &ctx,
                task.id,
                CreateCommentRequest {
                    content: "Agreed".to_string(),
                    parent_id: Some(Uuid::new_v4()),
                },
            )
            .await
            .expect_err("parent is elsewhere");
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Parent comment not found"));
    }

    #[tokio::test]
    async fn comments_page_carries_authors() {
        let ctx = ctx_as(SystemRole::Viewer);
        let task = fixtures::task(Uuid::new_v4(), "Discuss", Uuid::new_v4());
        let author = fixtures::user("ada@example.com");
        let db = visible(
            MockDatabase::new(DatabaseBackend::Postgres),
            &ctx,
            &task,
            ProjectRole::Viewer,
        )
        .append_query_results([[fixtures::comment(task.id, author.id, "First")]])
        .append_query_results([[author.clone()]])
        .into_connection();

        let page = service(&db)
            .comments(&ctx, task.id, CommentListQuery::default())
            .await
            .expect("comments should load");
        assert_eq!(page.page_size, 20);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].author.as_ref().map(|a| a.id), Some(author.id));
    }

    #[tokio::test]
    async fn empty_comment_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let err = service(&db)
            .add_comment(
                &ctx_as(SystemRole::TeamMember),
                Uuid::new_v4(),
                CreateCommentRequest::default(),
            )
            .await
            .expect_err("empty content");
        assert_eq!(err.field_errors()[0].field, "content");
    }
}
