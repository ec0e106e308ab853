use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoResult};
use crate::auth::{Permission, SystemRole};
use crate::db::entities::{prelude::Role, role};

#[derive(Clone)]
pub struct RoleDao {
    db: DatabaseConnection,
}

impl DaoBase for RoleDao {
    type Entity = Role;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl RoleDao {
    /// Creates the predefined role inside `organization_id`, carrying its
    /// fixed permission bundle.
    pub async fn create_system_role_with<C>(
        conn: &C,
        organization_id: Uuid,
        system_role: SystemRole,
        description: &str,
    ) -> DaoResult<role::Model>
    where
        C: ConnectionTrait + Sync,
    {
        let permissions = permissions_json(&system_role.permissions());
        Self::create_with(
            conn,
            role::ActiveModel {
                organization_id: Set(organization_id),
                name: Set(system_role.as_str().to_string()),
                description: Set(Some(description.to_string())),
                permissions: Set(permissions),
                is_system_role: Set(true),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn find_by_ids(&self, ids: Vec<Uuid>) -> DaoResult<Vec<role::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(move |query| query.filter(role::Column::Id.is_in(ids)))
            .await
    }
}

pub fn permissions_json(permissions: &[Permission]) -> serde_json::Value {
    serde_json::to_value(permissions).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
}
