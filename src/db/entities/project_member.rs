use sea_orm::entity::prelude::*;

use crate::auth::ProjectRole;
use crate::db::dao::base_traits::impl_base_entity;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "project_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(unique_key = "project_user")]
    pub project_id: Uuid,
    #[sea_orm(indexed, unique_key = "project_user")]
    pub user_id: Uuid,
    pub role: String,
    #[sea_orm(belongs_to, from = "project_id", to = "id", on_delete = "Cascade")]
    pub project: HasOne<super::project::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id", on_delete = "Cascade")]
    pub user: HasOne<super::user::Entity>,
}

impl Model {
    /// Unknown stored labels are treated as the least privileged role.
    pub fn project_role(&self) -> ProjectRole {
        ProjectRole::try_from(self.role.as_str()).unwrap_or(ProjectRole::Viewer)
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl_base_entity!();
