use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::refresh_token::{self, Entity as RefreshToken};

#[derive(Clone)]
pub struct RefreshTokenDao {
    db: DatabaseConnection,
}

impl DaoBase for RefreshTokenDao {
    type Entity = RefreshToken;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl RefreshTokenDao {
    pub async fn store_with<C>(
        conn: &C,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DaoResult<refresh_token::Model>
    where
        C: ConnectionTrait + Sync,
    {
        Self::create_with(
            conn,
            refresh_token::ActiveModel {
                token: Set(token.to_string()),
                user_id: Set(user_id),
                organization_id: Set(organization_id),
                expires_at: Set(expires_at.fixed_offset()),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn store(
        &self,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DaoResult<refresh_token::Model> {
        Self::store_with(self.db(), user_id, organization_id, token, expires_at).await
    }

    /// The stored token for `user_id`, provided it has not expired yet.
    pub async fn find_live(
        &self,
        token: &str,
        user_id: Uuid,
    ) -> DaoResult<Option<refresh_token::Model>> {
        let token = token.to_string();
        let now = Utc::now().fixed_offset();
        self.find_one(move |query| {
            query
                .filter(refresh_token::Column::Token.eq(token))
                .filter(refresh_token::Column::UserId.eq(user_id))
                .filter(refresh_token::Column::ExpiresAt.gt(now))
        })
        .await
    }

    pub async fn delete_for_user_with<C>(conn: &C, user_id: Uuid) -> DaoResult<u64>
    where
        C: ConnectionTrait + Sync,
    {
        let result = RefreshToken::delete_many()
            .filter(refresh_token::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_for_user(&self, user_id: Uuid) -> DaoResult<u64> {
        Self::delete_for_user_with(self.db(), user_id).await
    }

    /// Deletes `old_id` and stores its replacement in one transaction. A row
    /// that is already gone means the token was used concurrently; nothing
    /// is written in that case.
    pub async fn rotate(
        &self,
        old_id: Uuid,
        user_id: Uuid,
        organization_id: Option<Uuid>,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> DaoResult<refresh_token::Model> {
        let txn = self.db.begin().await?;

        let deleted = RefreshToken::delete_by_id(old_id).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            return Err(DaoLayerError::NotFound {
                entity: "refresh_token",
                id: old_id,
            });
        }

        let stored = Self::store_with(&txn, user_id, organization_id, token, expires_at).await?;
        txn.commit().await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use uuid::Uuid;

    use super::RefreshTokenDao;
    use crate::db::dao::{DaoBase, DaoLayerError};
    use crate::test_helpers::fixtures;

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn find_live_returns_matching_token() {
        let user_id = Uuid::new_v4();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[fixtures::refresh_token("token-1", user_id, None)]])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let token = dao
            .find_live("token-1", user_id)
            .await
            .expect("query should succeed")
            .expect("token should exist");
        assert_eq!(token.user_id, user_id);
        assert_eq!(token.token, "token-1");
    }

    #[tokio::test]
    async fn delete_for_user_reports_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(3)])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        assert_eq!(dao.delete_for_user(Uuid::new_v4()).await.expect("delete"), 3);
    }

    #[tokio::test]
    async fn rotate_replaces_inside_one_transaction() {
        let user_id = Uuid::new_v4();
        let old = fixtures::refresh_token("old", user_id, None);
        let new = fixtures::refresh_token("new", user_id, None);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1)])
            .append_query_results([[new.clone()]])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let stored = dao
            .rotate(old.id, user_id, None, "new", Utc::now() + Duration::days(7))
            .await
            .expect("rotate should succeed");
        assert_eq!(stored.token, "new");
    }

    #[tokio::test]
    async fn rotate_of_consumed_token_writes_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0)])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let err = dao
            .rotate(
                Uuid::new_v4(),
                Uuid::new_v4(),
                None,
                "new",
                Utc::now() + Duration::days(7),
            )
            .await
            .expect_err("rotate should fail");
        assert!(matches!(err, DaoLayerError::NotFound { entity: "refresh_token", .. }));
    }

    #[tokio::test]
    async fn store_maps_database_errors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_errors([DbErr::Custom("insert failed".to_string())])
            .into_connection();
        let dao = RefreshTokenDao::new(&db);

        let err = dao
            .store(Uuid::new_v4(), None, "t", Utc::now())
            .await
            .expect_err("insert should fail");
        assert!(matches!(err, DaoLayerError::Db(_)));
    }
}
