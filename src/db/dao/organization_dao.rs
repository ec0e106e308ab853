use sea_orm::{ColumnTrait, DatabaseConnection, QueryFilter};
use uuid::Uuid;

use super::{DaoBase, DaoResult};
use crate::db::entities::{organization, prelude::Organization};

#[derive(Clone)]
pub struct OrganizationDao {
    db: DatabaseConnection,
}

impl DaoBase for OrganizationDao {
    type Entity = Organization;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl OrganizationDao {
    pub async fn find_by_slug(&self, slug: &str) -> DaoResult<Option<organization::Model>> {
        let slug = slug.to_string();
        self.find_one(move |query| query.filter(organization::Column::Slug.eq(slug)))
            .await
    }

    pub async fn find_by_ids(&self, ids: Vec<Uuid>) -> DaoResult<Vec<organization::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.find_all(move |query| query.filter(organization::Column::Id.is_in(ids)))
            .await
    }
}
