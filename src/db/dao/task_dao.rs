use sea_orm::{ColumnTrait, DatabaseConnection, Order, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use super::{ColumnFilter, DaoBase, DaoResult, PaginatedResponse, project_dao::search_condition};
use crate::db::entities::{prelude::Task, task};

#[derive(Clone)]
pub struct TaskDao {
    db: DatabaseConnection,
}

impl DaoBase for TaskDao {
    type Entity = Task;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Restrictions applied when listing tasks. `project_ids` is mandatory
/// scoping; the rest are optional narrowing filters.
#[derive(Debug, Clone, Default)]
pub struct TaskListFilter {
    pub project_ids: Vec<Uuid>,
    pub task_ids: Option<Vec<Uuid>>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

impl TaskDao {
    pub async fn list(
        &self,
        filter: TaskListFilter,
        page: u64,
        page_size: u64,
    ) -> DaoResult<PaginatedResponse<task::Model>> {
        let mut filters = vec![ColumnFilter::is_in(
            task::Column::ProjectId,
            filter.project_ids,
        )];
        if let Some(ids) = filter.task_ids {
            filters.push(ColumnFilter::is_in(task::Column::Id, ids));
        }
        if let Some(status) = filter.status {
            filters.push(ColumnFilter::eq(task::Column::Status, status));
        }
        if let Some(priority) = filter.priority {
            filters.push(ColumnFilter::eq(task::Column::Priority, priority));
        }

        let search = filter.search;
        self.find_with_filters(page, page_size, None, &filters, move |query| {
            match search.as_deref().filter(|s| !s.is_empty()) {
                Some(search) => query.filter(search_condition(
                    &[task::Column::Title, task::Column::Description],
                    search,
                )),
                None => query,
            }
        })
        .await
    }

    pub async fn find_in_project(
        &self,
        id: Uuid,
        project_id: Uuid,
    ) -> DaoResult<Option<task::Model>> {
        self.find_one(move |query| {
            query
                .filter(task::Column::Id.eq(id))
                .filter(task::Column::ProjectId.eq(project_id))
        })
        .await
    }

    pub async fn subtasks(&self, parent_id: Uuid) -> DaoResult<Vec<task::Model>> {
        self.find_all(move |query| {
            query
                .filter(task::Column::ParentId.eq(parent_id))
                .order_by(task::Column::CreatedAt, Order::Asc)
        })
        .await
    }

    pub async fn has_subtasks(&self, parent_id: Uuid) -> DaoResult<bool> {
        self.find_one(move |query| query.filter(task::Column::ParentId.eq(parent_id)))
            .await
            .map(|found| found.is_some())
    }

    pub async fn for_project(&self, project_id: Uuid) -> DaoResult<Vec<task::Model>> {
        self.find_all(move |query| query.filter(task::Column::ProjectId.eq(project_id)))
            .await
    }
}

/// Builds the insert model for a new task with status `todo`.
pub fn new_task(
    project_id: Uuid,
    parent_id: Option<Uuid>,
    title: String,
    created_by_id: Uuid,
) -> task::ActiveModel {
    task::ActiveModel {
        project_id: Set(project_id),
        parent_id: Set(parent_id),
        title: Set(title),
        description: Set(None),
        status: Set(task::TaskStatus::Todo.as_str().to_string()),
        priority: Set("medium".to_string()),
        start_date: Set(None),
        due_date: Set(None),
        estimated_hours: Set(None),
        actual_hours: Set(None),
        tags: Set(serde_json::Value::Array(Vec::new())),
        created_by_id: Set(created_by_id),
        ..Default::default()
    }
}
