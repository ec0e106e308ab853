use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoResult};
use crate::db::entities::{prelude::UserPassword, user_password};

#[derive(Clone)]
pub struct UserPasswordDao {
    db: DatabaseConnection,
}

impl DaoBase for UserPasswordDao {
    type Entity = UserPassword;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl UserPasswordDao {
    pub async fn find_by_user(&self, user_id: Uuid) -> DaoResult<Option<user_password::Model>> {
        self.find_one(move |query| query.filter(user_password::Column::UserId.eq(user_id)))
            .await
    }

    pub async fn create_for_user_with<C>(
        conn: &C,
        user_id: Uuid,
        password_hash: String,
    ) -> DaoResult<user_password::Model>
    where
        C: ConnectionTrait + Sync,
    {
        Self::create_with(
            conn,
            user_password::ActiveModel {
                user_id: Set(user_id),
                password_hash: Set(password_hash),
                ..Default::default()
            },
        )
        .await
    }

    /// Overwrites the user's single password row, creating it when absent.
    pub async fn replace_with<C>(
        conn: &C,
        user_id: Uuid,
        password_hash: String,
    ) -> DaoResult<user_password::Model>
    where
        C: ConnectionTrait + Sync,
    {
        let existing = UserPassword::find()
            .filter(user_password::Column::UserId.eq(user_id))
            .one(conn)
            .await?;

        match existing {
            Some(row) => {
                Self::update_with(conn, row.id, move |active| {
                    active.password_hash = Set(password_hash);
                })
                .await
            }
            None => Self::create_for_user_with(conn, user_id, password_hash).await,
        }
    }

    pub async fn replace(&self, user_id: Uuid, password_hash: String) -> DaoResult<()> {
        Self::replace_with(self.db(), user_id, password_hash)
            .await
            .map(|_| ())
    }
}
