use std::collections::HashMap;

use sea_orm::{Set, TransactionTrait, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{OrgContext, ProjectRole},
    db::dao::{
        BoardDao, DaoBase, DaoContext, PaginatedResponse, ProjectDao, ProjectMemberDao,
        project_dao::{ProjectListFilter, next_free_slug},
    },
    db::entities::{
        board, board_column,
        project::{self, Priority, ProjectStatus},
        project_member,
        task::{self, TaskStatus},
        user,
    },
    error::{AppError, FieldError, validate_with},
    services::{pagination::PageParams, slug::sanitize_slug, user_service::UserSummary},
};

pub const PROJECT_NOT_FOUND: &str = "Project not found";
const DEFAULT_PAGE_SIZE: u64 = 20;
const DEFAULT_CURRENCY: &str = "USD";
const INVALID_PROJECT_ROLE: &str = "Role must be one of: admin, manager, member, viewer";

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Project name must be 1-100 characters"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTimeWithTimeZone>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTimeWithTimeZone>,
    #[validate(range(min = 0.0, message = "Budget must be a positive number"))]
    pub budget: Option<f64>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "Project name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTimeWithTimeZone>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTimeWithTimeZone>,
    #[validate(range(min = 0.0, message = "Budget must be a positive number"))]
    pub budget: Option<f64>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
    pub budget: Option<f64>,
    pub currency: Option<String>,
    pub created_by_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<project::Model> for ProjectView {
    fn from(model: project::Model) -> Self {
        Self {
            id: model.id,
            organization_id: model.organization_id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            status: model.status,
            priority: model.priority,
            start_date: model.start_date,
            end_date: model.end_date,
            budget: model.budget,
            currency: model.currency,
            created_by_id: model.created_by_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    #[serde(flatten)]
    pub summary: UserSummary,
    pub email: String,
    pub title: Option<String>,
}

impl From<&user::Model> for MemberProfile {
    fn from(model: &user::Model) -> Self {
        Self {
            summary: model.into(),
            email: model.email.clone(),
            title: model.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMemberView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub joined_at: DateTimeWithTimeZone,
    pub user: Option<MemberProfile>,
}

impl ProjectMemberView {
    fn new(member: project_member::Model, user: Option<&user::Model>) -> Self {
        Self {
            id: member.id,
            user_id: member.user_id,
            role: member.role,
            joined_at: member.created_at,
            user: user.map(MemberProfile::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub position: i32,
}

impl From<board_column::Model> for ColumnView {
    fn from(model: board_column::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            position: model.position,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub position: i32,
    pub columns: Vec<ColumnView>,
}

impl BoardView {
    fn new(board: board::Model, columns: Vec<board_column::Model>) -> Self {
        Self {
            id: board.id,
            name: board.name,
            kind: board.kind,
            position: board.position,
            columns: columns.into_iter().map(ColumnView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: u64,
    pub todo: u64,
    pub in_progress: u64,
    pub review: u64,
    pub done: u64,
    pub blocked: u64,
}

impl TaskStats {
    pub fn from_tasks(tasks: &[task::Model]) -> Self {
        let mut stats = Self::default();
        for task in tasks {
            stats.total += 1;
            match TaskStatus::try_from(task.status.as_str()) {
                Ok(TaskStatus::Todo) => stats.todo += 1,
                Ok(TaskStatus::InProgress) => stats.in_progress += 1,
                Ok(TaskStatus::Review) => stats.review += 1,
                Ok(TaskStatus::Done) => stats.done += 1,
                Ok(TaskStatus::Blocked) => stats.blocked += 1,
                Err(()) => {}
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: ProjectView,
    pub members: Vec<ProjectMemberView>,
    pub boards: Vec<BoardView>,
    pub task_stats: TaskStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProject {
    #[serde(flatten)]
    pub project: ProjectView,
    pub boards: Vec<BoardView>,
}

#[derive(Clone)]
pub struct ProjectService {
    daos: DaoContext,
}

impl ProjectService {
    pub fn new(daos: DaoContext) -> Self {
        Self { daos }
    }

    pub async fn list(
        &self,
        ctx: &OrgContext,
        query: ProjectListQuery,
    ) -> Result<PaginatedResponse<ProjectView>, AppError> {
        let (page, page_size) =
            PageParams::new(query.page, query.limit).resolve(DEFAULT_PAGE_SIZE)?;
        if let Some(status) = query.status.as_deref() {
            ProjectStatus::try_from(status)
                .map_err(|_| AppError::invalid_field("status", ProjectStatus::INVALID))?;
        }

        let filter = ProjectListFilter {
            status: query.status,
            search: query.search.map(|s| s.trim().to_string()),
        };
        let projects = self
            .daos
            .project()
            .list_in_org(ctx.organization_id, filter, page, page_size)
            .await?;
        Ok(projects.map(ProjectView::from))
    }

    /// Creates the project with its creator as admin and a default board,
    /// in one transaction. The slug is made unique within the organization.
    pub async fn create(
        &self,
        ctx: &OrgContext,
        body: CreateProjectRequest,
    ) -> Result<CreatedProject, AppError> {
        let mut extra = priority_errors(body.priority.as_deref());
        let base_slug = sanitize_slug(&body.name);
        if !body.name.is_empty() && base_slug.is_empty() {
            extra.push(FieldError::new("name", "Invalid project name"));
        }
        validate_with(&body, extra)?;

        let taken = self
            .daos
            .project()
            .slugs_like(ctx.organization_id, &base_slug)
            .await?;
        let slug = next_free_slug(&base_slug, &taken);
        let priority = body.priority.unwrap_or_else(|| Priority::Medium.as_str().to_string());

        let txn = self.daos.db().begin().await?;
        let project = ProjectDao::create_with(
            &txn,
            project::ActiveModel {
                organization_id: Set(ctx.organization_id),
                name: Set(body.name.trim().to_string()),
                slug: Set(slug),
                description: Set(body.description),
                status: Set(ProjectStatus::Active.as_str().to_string()),
                priority: Set(priority),
                start_date: Set(body.start_date),
                end_date: Set(body.end_date),
                budget: Set(body.budget),
                currency: Set(Some(
                    body.currency
                        .map(|c| c.to_uppercase())
                        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                )),
                created_by_id: Set(ctx.user_id()),
                ..Default::default()
            },
        )
        .await?;
        ProjectMemberDao::add_with(&txn, project.id, ctx.user_id(), ProjectRole::Admin).await?;
        let (board, columns) = BoardDao::create_default_with(&txn, project.id).await?;
        txn.commit().await?;

        tracing::info!(
            project_id = %project.id,
            organization_id = %ctx.organization_id,
            slug = %project.slug,
            "project created"
        );

        Ok(CreatedProject {
            project: project.into(),
            boards: vec![BoardView::new(board, columns)],
        })
    }

    pub async fn detail(&self, ctx: &OrgContext, id: Uuid) -> Result<ProjectDetail, AppError> {
        let project = self.find_project(ctx, id).await?;
        let members = self.member_views(project.id).await?;
        let boards = self.board_views(project.id).await?;
        let tasks = self.daos.task().for_project(project.id).await?;

        Ok(ProjectDetail {
            project: project.into(),
            members,
            boards,
            task_stats: TaskStats::from_tasks(&tasks),
        })
    }

    pub async fn update(
        &self,
        ctx: &OrgContext,
        id: Uuid,
        body: UpdateProjectRequest,
    ) -> Result<ProjectView, AppError> {
        let mut extra = priority_errors(body.priority.as_deref());
        if let Some(status) = body.status.as_deref()
            && ProjectStatus::try_from(status).is_err()
        {
            extra.push(FieldError::new("status", ProjectStatus::INVALID));
        }
        validate_with(&body, extra)?;

        let project = self.find_project(ctx, id).await?;
        if !self
            .caller_role(project.id, ctx.user_id())
            .await?
            .is_some_and(|role| role.can_manage())
        {
            return Err(AppError::forbidden("Insufficient permissions to update project"));
        }

        let updated = self
            .daos
            .project()
            .update(project.id, move |active| {
                if let Some(name) = body.name {
                    active.name = Set(name.trim().to_string());
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
                if let Some(end_date) = body.end_date {
                    active.end_date = Set(Some(end_date));
                }
                if let Some(budget) = body.budget {
                    active.budget = Set(Some(budget));
                }
                if let Some(currency) = body.currency {
                    active.currency = Set(Some(currency.to_uppercase()));
                }
            })
            .await?;

        tracing::info!(project_id = %updated.id, "project updated");
        Ok(updated.into())
    }

    pub async fn delete(&self, ctx: &OrgContext, id: Uuid) -> Result<(), AppError> {
        let project = self.find_project(ctx, id).await?;
        if self.caller_role(project.id, ctx.user_id()).await? != Some(ProjectRole::Admin) {
            return Err(AppError::forbidden("Only project admins can delete projects"));
        }

        self.daos.project().delete(project.id).await?;
        tracing::info!(project_id = %project.id, "project deleted");
        Ok(())
    }

    pub async fn members(
        &self,
        ctx: &OrgContext,
        id: Uuid,
    ) -> Result<Vec<ProjectMemberView>, AppError> {
        let project = self.find_project(ctx, id).await?;
        self.member_views(project.id).await
    }

    pub async fn add_member(
        &self,
        ctx: &OrgContext,
        id: Uuid,
        body: AddMemberRequest,
    ) -> Result<ProjectMemberView, AppError> {
        let role = match body.role.as_deref() {
            None => ProjectRole::Member,
            Some(role) => ProjectRole::try_from(role)
                .map_err(|_| AppError::invalid_field("role", INVALID_PROJECT_ROLE))?,
        };

        let project = self.find_project(ctx, id).await?;
        if !self
            .caller_role(project.id, ctx.user_id())
            .await?
            .is_some_and(|role| role.can_manage())
        {
            return Err(AppError::forbidden("Insufficient permissions to add members"));
        }

        if self
            .daos
            .membership()
            .find_active(body.user_id, ctx.organization_id)
            .await?
            .is_none()
        {
            return Err(AppError::not_found("User not found in organization"));
        }
        if self
            .daos
            .project_member()
            .find_member(project.id, body.user_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("User is already a member of this project"));
        }

        let member =
            ProjectMemberDao::add_with(self.daos.db(), project.id, body.user_id, role).await?;
        let user = self.daos.user().find_optional(body.user_id).await?;

        tracing::info!(
            project_id = %project.id,
            user_id = %body.user_id,
            role = role.as_str(),
            "project member added"
        );
        Ok(ProjectMemberView::new(member, user.as_ref()))
    }

    pub async fn remove_member(
        &self,
        ctx: &OrgContext,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        let project = self.find_project(ctx, id).await?;
        if !self
            .caller_role(project.id, ctx.user_id())
            .await?
            .is_some_and(|role| role.can_manage())
        {
            return Err(AppError::forbidden("Insufficient permissions to remove members"));
        }

        let target = self
            .daos
            .project_member()
            .find_member(project.id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found in project"))?;
        if target.project_role() == ProjectRole::Admin
            && self.admin_count(project.id).await? <= 1
        {
            return Err(AppError::bad_request("Cannot remove the last project admin"));
        }

        self.daos.project_member().remove(project.id, user_id).await?;
        tracing::info!(project_id = %project.id, user_id = %user_id, "project member removed");
        Ok(())
    }

    pub async fn update_member_role(
        &self,
        ctx: &OrgContext,
        id: Uuid,
        user_id: Uuid,
        body: UpdateMemberRoleRequest,
    ) -> Result<ProjectMemberView, AppError> {
        let role = ProjectRole::try_from(body.role.as_str())
            .map_err(|_| AppError::invalid_field("role", INVALID_PROJECT_ROLE))?;

        let project = self.find_project(ctx, id).await?;
        if self.caller_role(project.id, ctx.user_id()).await? != Some(ProjectRole::Admin) {
            return Err(AppError::forbidden("Only project admins can update member roles"));
        }

        let target = self
            .daos
            .project_member()
            .find_member(project.id, user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found in project"))?;
        if target.project_role() == ProjectRole::Admin
            && role != ProjectRole::Admin
            && self.admin_count(project.id).await? <= 1
        {
            return Err(AppError::bad_request("Cannot demote the last project admin"));
        }

        let member = self.daos.project_member().set_role(target.id, role).await?;
        let user = self.daos.user().find_optional(user_id).await?;

        tracing::info!(
            project_id = %project.id,
            user_id = %user_id,
            role = role.as_str(),
            "project member role changed"
        );
        Ok(ProjectMemberView::new(member, user.as_ref()))
    }

    pub async fn boards(&self, ctx: &OrgContext, id: Uuid) -> Result<Vec<BoardView>, AppError> {
        let project = self.find_project(ctx, id).await?;
        self.board_views(project.id).await
    }

    async fn find_project(&self, ctx: &OrgContext, id: Uuid) -> Result<project::Model, AppError> {
        self.daos
            .project()
            .find_in_org(id, ctx.organization_id)
            .await?
            .ok_or_else(|| AppError::not_found(PROJECT_NOT_FOUND))
    }

    async fn caller_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectRole>, AppError> {
        Ok(self
            .daos
            .project_member()
            .find_member(project_id, user_id)
            .await?
            .map(|member| member.project_role()))
    }

    async fn admin_count(&self, project_id: Uuid) -> Result<usize, AppError> {
        Ok(self
            .daos
            .project_member()
            .list_for_project(project_id)
            .await?
            .iter()
            .filter(|member| member.project_role() == ProjectRole::Admin)
            .count())
    }

    async fn member_views(&self, project_id: Uuid) -> Result<Vec<ProjectMemberView>, AppError> {
        let members = self.daos.project_member().list_for_project(project_id).await?;
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let users: HashMap<Uuid, user::Model> = self
            .daos
            .user()
            .find_by_ids(members.iter().map(|m| m.user_id).collect())
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        Ok(members
            .into_iter()
            .map(|member| {
                let user = users.get(&member.user_id);
                ProjectMemberView::new(member, user)
            })
            .collect())
    }

    async fn board_views(&self, project_id: Uuid) -> Result<Vec<BoardView>, AppError> {
        let boards = self.daos.board().list_for_project(project_id).await?;
        let mut columns: HashMap<Uuid, Vec<board_column::Model>> = HashMap::new();
        for column in self
            .daos
            .board_column()
            .list_for_boards(boards.iter().map(|b| b.id).collect())
            .await?
        {
            columns.entry(column.board_id).or_default().push(column);
        }

        Ok(boards
            .into_iter()
            .map(|board| {
                let columns = columns.remove(&board.id).unwrap_or_default();
                BoardView::new(board, columns)
            })
            .collect())
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
