use sea_orm::sea_query::{Expr, ExprTrait, Func};
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, QueryFilter, QuerySelect};
use uuid::Uuid;

use super::{ColumnFilter, DaoBase, DaoResult, PaginatedResponse};
use crate::db::entities::{prelude::Project, project};

#[derive(Clone)]
pub struct ProjectDao {
    db: DatabaseConnection,
}

impl DaoBase for ProjectDao {
    type Entity = Project;

    fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Case-insensitive `LIKE` over several text columns, any of which may match.
pub fn search_condition<C>(columns: &[C], search: &str) -> Condition
where
    C: ColumnTrait,
{
    let pattern = format!("%{}%", search.to_lowercase());
    columns.iter().fold(Condition::any(), |cond, column| {
        cond.add(Expr::from(Func::lower(Expr::col(*column))).like(pattern.clone()))
    })
}

#[derive(Debug, Clone, Default)]
pub struct ProjectListFilter {
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ProjectDao {
    pub async fn find_in_org(
        &self,
        id: Uuid,
        organization_id: Uuid,
    ) -> DaoResult<Option<project::Model>> {
        self.find_one(move |query| {
            query
                .filter(project::Column::Id.eq(id))
                .filter(project::Column::OrganizationId.eq(organization_id))
        })
        .await
    }

    pub async fn list_in_org(
        &self,
        organization_id: Uuid,
        filter: ProjectListFilter,
        page: u64,
        page_size: u64,
    ) -> DaoResult<PaginatedResponse<project::Model>> {
        let mut filters = vec![ColumnFilter::eq(
            project::Column::OrganizationId,
            organization_id,
        )];
        if let Some(status) = filter.status {
            filters.push(ColumnFilter::eq(project::Column::Status, status));
        }

        self.find_with_filters(page, page_size, None, &filters, move |query| {
            match filter.search.as_deref().filter(|s| !s.is_empty()) {
                Some(search) => query.filter(search_condition(
                    &[project::Column::Name, project::Column::Description],
                    search,
                )),
                None => query,
            }
        })
        .await
    }

    /// Ids of the given projects that belong to `organization_id`.
    pub async fn ids_in_org(
        &self,
        ids: Vec<Uuid>,
        organization_id: Uuid,
    ) -> DaoResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let projects = self
            .find_all(move |query| {
                query
                    .filter(project::Column::Id.is_in(ids))
                    .filter(project::Column::OrganizationId.eq(organization_id))
            })
            .await?;
        Ok(projects.into_iter().map(|p| p.id).collect())
    }

    /// Slugs in the organization equal to `base` or starting with `base-`.
    pub async fn slugs_like(&self, organization_id: Uuid, base: &str) -> DaoResult<Vec<String>> {
        let exact = base.to_string();
        let prefixed = format!("{base}-%");
        let projects = self
            .find_all(move |query| {
                query
                    .filter(project::Column::OrganizationId.eq(organization_id))
                    .filter(
                        Condition::any()
                            .add(project::Column::Slug.eq(exact))
                            .add(project::Column::Slug.like(prefixed)),
                    )
                    .limit(1000)
            })
            .await?;
        Ok(projects.into_iter().map(|p| p.slug).collect())
    }
}

/// First of `base`, `base-1`, `base-2`, ... not already taken.
pub fn next_free_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{base}-{}", Uuid::new_v4().simple()))
}
