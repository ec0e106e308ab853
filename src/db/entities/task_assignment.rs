use sea_orm::entity::prelude::*;

use crate::db::dao::base_traits::impl_base_entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentRole {
    Assignee,
    Reviewer,
    Observer,
}

impl AssignmentRole {
    pub const INVALID: &'static str = "Role must be one of: assignee, reviewer, observer";

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentRole::Assignee => "assignee",
            AssignmentRole::Reviewer => "reviewer",
            AssignmentRole::Observer => "observer",
        }
    }
}

impl TryFrom<&str> for AssignmentRole {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "assignee" => Ok(AssignmentRole::Assignee),
            "reviewer" => Ok(AssignmentRole::Reviewer),
            "observer" => Ok(AssignmentRole::Observer),
            _ => Err(()),
        }
    }
}

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "task_assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(unique_key = "task_user")]
    pub task_id: Uuid,
    #[sea_orm(indexed, unique_key = "task_user")]
    pub user_id: Uuid,
    pub role: String,
    #[sea_orm(belongs_to, from = "task_id", to = "id", on_delete = "Cascade")]
    pub task: HasOne<super::task::Entity>,
    #[sea_orm(belongs_to, from = "user_id", to = "id", on_delete = "Cascade")]
    pub user: HasOne<super::user::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

impl_base_entity!();
