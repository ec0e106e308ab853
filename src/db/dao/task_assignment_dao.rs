use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::{DaoBase, DaoResult};
use crate::db::entities::{
    prelude::TaskAssignment,
    task_assignment::{self, AssignmentRole},
};

#[derive(Clone)]
pub struct TaskAssignmentDao {
    db: DatabaseConnection,
}

impl DaoBase for TaskAssignmentDao {
    type Entity = TaskAssignment;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl TaskAssignmentDao {
    pub async fn assign_with<C>(
        conn: &C,
        task_id: Uuid,
        user_id: Uuid,
        role: AssignmentRole,
    ) -> DaoResult<task_assignment::Model>
    where
        C: ConnectionTrait + Sync,
    {
        Self::create_with(
            conn,
            task_assignment::ActiveModel {
                task_id: Set(task_id),
                user_id: Set(user_id),
                role: Set(role.as_str().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn find_assignment(
        &self,
        task_id: Uuid,
        user_id: Uuid,
    ) -> DaoResult<Option<task_assignment::Model>> {
        self.find_one(move |query| {
            query
                .filter(task_assignment::Column::TaskId.eq(task_id))
                .filter(task_assignment::Column::UserId.eq(user_id))
        })
        .await
    }

    pub async fn list_for_task(&self, task_id: Uuid) -> DaoResult<Vec<task_assignment::Model>> {
        self.find_all(move |query| {
            query
                .filter(task_assignment::Column::TaskId.eq(task_id))
                .order_by(task_assignment::Column::CreatedAt, Order::Asc)
        })
        .await
    }

    pub async fn task_ids_for_user(&self, user_id: Uuid) -> DaoResult<Vec<Uuid>> {
        let rows = self
            .find_all(move |query| query.filter(task_assignment::Column::UserId.eq(user_id)))
            .await?;
        Ok(rows.into_iter().map(|row| row.task_id).collect())
    }

    pub async fn unassign(&self, task_id: Uuid, user_id: Uuid) -> DaoResult<u64> {
        let result = TaskAssignment::delete_many()
            .filter(task_assignment::Column::TaskId.eq(task_id))
            .filter(task_assignment::Column::UserId.eq(user_id))
            .exec(self.db())
            .await?;
        Ok(result.rows_affected)
    }
}
