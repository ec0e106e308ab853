use serde::Serialize;
use uuid::Uuid;

use super::{Permission, permission_string_granted};
use crate::db::entities::organization_user;

/// Verified caller, built from a valid access token and a live user row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub organization_id: Option<Uuid>,
    pub role_id: Option<Uuid>,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn grants(&self, required: &str) -> bool {
        permission_string_granted(&self.permissions, required)
    }
}

/// An [`AuthUser`] whose working organization has been checked against an
/// active membership. `role_permissions` are the structured permissions of
/// that membership's role, conditions included.
#[derive(Debug, Clone)]
pub struct OrgContext {
    pub user: AuthUser,
    pub organization_id: Uuid,
    pub membership: organization_user::Model,
    pub role_permissions: Vec<Permission>,
}

impl OrgContext {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }
}
