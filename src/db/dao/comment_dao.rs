use sea_orm::{ColumnTrait, DatabaseConnection, Order, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoResult, PaginatedResponse};
use crate::db::entities::{comment, prelude::Comment};

#[derive(Clone)]
pub struct CommentDao {
    db: DatabaseConnection,
}

impl DaoBase for CommentDao {
    type Entity = Comment;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl CommentDao {
    pub async fn add(
        &self,
        task_id: Uuid,
        author_id: Uuid,
        parent_id: Option<Uuid>,
        content: String,
    ) -> DaoResult<comment::Model> {
        self.create(comment::ActiveModel {
            task_id: Set(task_id),
            author_id: Set(author_id),
            parent_id: Set(parent_id),
            content: Set(content),
            ..Default::default()
        })
        .await
    }

    /// Oldest first, so a thread reads top to bottom.
    pub async fn page_for_task(
        &self,
        task_id: Uuid,
        page: u64,
        page_size: u64,
    ) -> DaoResult<PaginatedResponse<comment::Model>> {
        self.find(
            page,
            page_size,
            Some((comment::Column::CreatedAt, Order::Asc)),
            move |query| query.filter(comment::Column::TaskId.eq(task_id)),
        )
        .await
    }

    pub async fn find_in_task(
        &self,
        id: Uuid,
        task_id: Uuid,
    ) -> DaoResult<Option<comment::Model>> {
        self.find_one(move |query| {
            query
                .filter(comment::Column::Id.eq(id))
                .filter(comment::Column::TaskId.eq(task_id))
        })
        .await
    }
}
