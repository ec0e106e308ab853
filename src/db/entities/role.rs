use sea_orm::entity::prelude::*;

use crate::auth::Permission;
use crate::db::dao::base_traits::impl_base_entity;

/// Permission bundle scoped to one organization. `permissions` holds a JSON
/// array of [`Permission`].
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(indexed)]
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Json,
    pub is_system_role: bool,
    #[sea_orm(belongs_to, from = "organization_id", to = "id", on_delete = "Cascade")]
    pub organization: HasOne<super::organization::Entity>,
}

impl Model {
    /// Stored permissions; entries that no longer parse are skipped.
    pub fn permission_list(&self) -> Vec<Permission> {
        match &self.permissions {
            Json::Array(items) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl_base_entity!();
