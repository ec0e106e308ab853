use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, Order, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use super::{DaoBase, DaoResult};
use crate::db::entities::{
    organization_user::{self, MembershipStatus},
    prelude::OrganizationUser,
};

/// Organization membership rows (`organization_users`).
#[derive(Clone)]
pub struct MembershipDao {
    db: DatabaseConnection,
}

impl DaoBase for MembershipDao {
    type Entity = OrganizationUser;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl MembershipDao {
    pub async fn create_active_with<C>(
        conn: &C,
        organization_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> DaoResult<organization_user::Model>
    where
        C: ConnectionTrait + Sync,
    {
        Self::create_with(
            conn,
            organization_user::ActiveModel {
                organization_id: Set(organization_id),
                user_id: Set(user_id),
                role_id: Set(role_id),
                status: Set(MembershipStatus::Active.as_str().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn find_active(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> DaoResult<Option<organization_user::Model>> {
        self.find_one(move |query| {
            query
                .filter(organization_user::Column::UserId.eq(user_id))
                .filter(organization_user::Column::OrganizationId.eq(organization_id))
                .filter(organization_user::Column::Status.eq(MembershipStatus::Active.as_str()))
        })
        .await
    }

    /// Active memberships, earliest joined first.
    pub async fn active_for_user(&self, user_id: Uuid) -> DaoResult<Vec<organization_user::Model>> {
        self.find_all(move |query| {
            query
                .filter(organization_user::Column::UserId.eq(user_id))
                .filter(organization_user::Column::Status.eq(MembershipStatus::Active.as_str()))
                .order_by(organization_user::Column::CreatedAt, Order::Asc)
        })
        .await
    }

    pub async fn for_organization(
        &self,
        organization_id: Uuid,
    ) -> DaoResult<Vec<organization_user::Model>> {
        self.find_all(move |query| {
            query
                .filter(organization_user::Column::OrganizationId.eq(organization_id))
                .order_by(organization_user::Column::CreatedAt, Order::Asc)
        })
        .await
    }
}
