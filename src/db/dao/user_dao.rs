use chrono::{DateTime, FixedOffset};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoResult};
use crate::db::entities::{prelude::User, user};

#[derive(Clone)]
pub struct UserDao {
    db: DatabaseConnection,
}

impl DaoBase for UserDao {
    type Entity = User;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Fields a new account starts with; everything else takes its default.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<NewUser> for user::ActiveModel {
    fn from(new: NewUser) -> Self {
        user::ActiveModel {
            email: Set(new.email),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            is_active: Set(true),
            email_verified: Set(false),
            avatar_url: Set(None),
            title: Set(None),
            timezone: Set("UTC".to_string()),
            locale: Set("en".to_string()),
            last_login_at: Set(None),
            password_reset_token_hash: Set(None),
            password_reset_expires_at: Set(None),
            ..Default::default()
        }
    }
}

impl UserDao {
    pub async fn find_by_email(&self, email: &str) -> DaoResult<Option<user::Model>> {
        let email = email.to_string();
        self.find_one(move |query| query.filter(user::Column::Email.eq(email)))
            .await
    }

    /// A missing row is `None`; query failures still surface.
    pub async fn find_optional(&self, id: Uuid) -> DaoResult<Option<user::Model>> {
        self.find_one(move |query| query.filter(user::Column::Id.eq(id)))
            .await
    }

    pub async fn find_by_ids(&self, ids: Vec<Uuid>) -> DaoResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(move |query| query.filter(user::Column::Id.is_in(ids)))
            .await
    }

    pub async fn find_by_reset_hash(&self, hash: &str) -> DaoResult<Option<user::Model>> {
        let hash = hash.to_string();
        self.find_one(move |query| {
            query.filter(user::Column::PasswordResetTokenHash.eq(hash))
        })
        .await
    }

    pub async fn set_last_login(&self, id: &Uuid, at: &DateTime<FixedOffset>) -> DaoResult<()> {
        let at = *at;
        self.update(*id, move |active| {
            active.last_login_at = Set(Some(at));
        })
        .await
        .map(|_| ())
    }

    pub async fn set_reset_token(
        &self,
        id: &Uuid,
        token_hash: String,
        expires_at: DateTime<FixedOffset>,
    ) -> DaoResult<()> {
        self.update(*id, move |active| {
            active.password_reset_token_hash = Set(Some(token_hash));
            active.password_reset_expires_at = Set(Some(expires_at));
        })
        .await
        .map(|_| ())
    }

    pub async fn clear_reset_token_with<C>(conn: &C, id: Uuid) -> DaoResult<()>
    where
        C: ConnectionTrait + Sync,
    {
        Self::update_with(conn, id, |active| {
            active.password_reset_token_hash = Set(None);
            active.password_reset_expires_at = Set(None);
        })
        .await
        .map(|_| ())
    }
}
