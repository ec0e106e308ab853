use std::collections::HashMap;

use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::{OrgContext, permission_strings},
    db::dao::{DaoBase, DaoContext, DaoLayerError},
    db::entities::{organization, organization_user, role},
    error::AppError,
    services::auth_service::ORGANIZATION_DENIED,
};

/// One organization the caller belongs to, with the role held there.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub joined_at: DateTimeWithTimeZone,
    #[serde(skip)]
    pub role_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<organization::Model> for OrganizationView {
    fn from(model: organization::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            logo_url: model.logo_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMemberView {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub title: Option<String>,
    pub role: Option<String>,
    pub status: String,
    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Clone)]
pub struct OrganizationService {
    daos: DaoContext,
}

impl OrganizationService {
    pub fn new(daos: DaoContext) -> Self {
        Self { daos }
    }

    pub async fn my_organizations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<OrganizationSummary>, AppError> {
        let memberships = self.daos.membership().active_for_user(user_id).await?;
        self.summaries(memberships).await
    }

    /// Joins memberships with their organizations and roles, keeping the
    /// membership order. Memberships whose organization or role vanished
    /// are dropped.
    pub async fn summaries(
        &self,
        memberships: Vec<organization_user::Model>,
    ) -> Result<Vec<OrganizationSummary>, AppError> {
        if memberships.is_empty() {
            return Ok(Vec::new());
        }

        let organizations: HashMap<Uuid, organization::Model> = self
            .daos
            .organization()
            .find_by_ids(memberships.iter().map(|m| m.organization_id).collect())
            .await?
            .into_iter()
            .map(|org| (org.id, org))
            .collect();
        let roles: HashMap<Uuid, role::Model> = self
            .daos
            .role()
            .find_by_ids(memberships.iter().map(|m| m.role_id).collect())
            .await?
            .into_iter()
            .map(|role| (role.id, role))
            .collect();

        Ok(memberships
            .into_iter()
            .filter_map(|membership| {
                let org = organizations.get(&membership.organization_id)?;
                let role = roles.get(&membership.role_id)?;
                Some(OrganizationSummary {
                    id: org.id,
                    name: org.name.clone(),
                    slug: org.slug.clone(),
                    logo_url: org.logo_url.clone(),
                    role: role.name.clone(),
                    permissions: permission_strings(&role.permission_list()),
                    joined_at: membership.created_at,
                    role_id: role.id,
                })
            })
            .collect())
    }

    pub async fn detail(&self, ctx: &OrgContext, id: Uuid) -> Result<OrganizationView, AppError> {
        ensure_working_organization(ctx, id)?;
        let organization = self
            .daos
            .organization()
            .find_by_id(id)
            .await
            .map_err(|err| match err {
                DaoLayerError::NotFound { .. } => AppError::not_found("Organization not found"),
                other => other.into(),
            })?;
        Ok(organization.into())
    }

    pub async fn members(
        &self,
        ctx: &OrgContext,
        id: Uuid,
    ) -> Result<Vec<OrganizationMemberView>, AppError> {
        ensure_working_organization(ctx, id)?;

        let memberships = self.daos.membership().for_organization(id).await?;
        let users: HashMap<_, _> = self
            .daos
            .user()
            .find_by_ids(memberships.iter().map(|m| m.user_id).collect())
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();
        let roles: HashMap<_, _> = self
            .daos
            .role()
            .find_by_ids(memberships.iter().map(|m| m.role_id).collect())
            .await?
            .into_iter()
            .map(|role| (role.id, role.name))
            .collect();

        Ok(memberships
            .into_iter()
            .filter_map(|membership| {
                let user = users.get(&membership.user_id)?;
                Some(OrganizationMemberView {
                    user_id: user.id,
                    email: user.email.clone(),
                    first_name: user.first_name.clone(),
                    last_name: user.last_name.clone(),
                    avatar_url: user.avatar_url.clone(),
                    title: user.title.clone(),
                    role: roles.get(&membership.role_id).cloned(),
                    status: membership.status,
                    joined_at: membership.created_at,
                })
            })
            .collect())
    }
}

fn ensure_working_organization(ctx: &OrgContext, id: Uuid) -> Result<(), AppError> {
    if ctx.organization_id != id {
        return Err(AppError::forbidden(ORGANIZATION_DENIED));
    }
    Ok(())
}
