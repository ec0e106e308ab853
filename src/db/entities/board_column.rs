use sea_orm::entity::prelude::*;

use crate::db::dao::base_traits::impl_base_entity;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "board_columns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(indexed)]
    pub board_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub position: i32,
    #[sea_orm(belongs_to, from = "board_id", to = "id", on_delete = "Cascade")]
    pub board: HasOne<super::board::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

impl_base_entity!();
