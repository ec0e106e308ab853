use sea_orm::entity::prelude::*;

use crate::db::dao::base_traits::impl_base_entity;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub avatar_url: Option<String>,
    pub title: Option<String>,
    pub timezone: String,
    pub locale: String,
    pub last_login_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(indexed)]
    pub password_reset_token_hash: Option<String>,
    pub password_reset_expires_at: Option<DateTimeWithTimeZone>,
}

impl ActiveModelBehavior for ActiveModel {}

impl_base_entity!();
