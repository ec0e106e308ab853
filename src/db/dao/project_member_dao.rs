use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::{DaoBase, DaoResult};
use crate::auth::ProjectRole;
use crate::db::entities::{prelude::ProjectMember, project_member};

#[derive(Clone)]
pub struct ProjectMemberDao {
    db: DatabaseConnection,
}

impl DaoBase for ProjectMemberDao {
    type Entity = ProjectMember;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl ProjectMemberDao {
    pub async fn add_with<C>(
        conn: &C,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> DaoResult<project_member::Model>
    where
        C: ConnectionTrait + Sync,
    {
        Self::create_with(
            conn,
            project_member::ActiveModel {
                project_id: Set(project_id),
                user_id: Set(user_id),
                role: Set(role.as_str().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn find_member(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> DaoResult<Option<project_member::Model>> {
        self.find_one(move |query| {
            query
                .filter(project_member::Column::ProjectId.eq(project_id))
                .filter(project_member::Column::UserId.eq(user_id))
        })
        .await
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> DaoResult<Vec<project_member::Model>> {
        self.find_all(move |query| {
            query
                .filter(project_member::Column::ProjectId.eq(project_id))
                .order_by(project_member::Column::CreatedAt, Order::Asc)
        })
        .await
    }

    pub async fn project_ids_for_user(&self, user_id: Uuid) -> DaoResult<Vec<Uuid>> {
        let rows = self
            .find_all(move |query| query.filter(project_member::Column::UserId.eq(user_id)))
            .await?;
        Ok(rows.into_iter().map(|row| row.project_id).collect())
    }

    pub async fn set_role(&self, id: Uuid, role: ProjectRole) -> DaoResult<project_member::Model> {
        self.update(id, move |active| {
            active.role = Set(role.as_str().to_string());
        })
        .await
    }

    pub async fn remove(&self, project_id: Uuid, user_id: Uuid) -> DaoResult<u64> {
        let result = ProjectMember::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .exec(self.db())
            .await?;
        Ok(result.rows_affected)
    }
}
