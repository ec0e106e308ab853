use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::{
    auth::TokenIssuer,
    db::dao::DaoContext,
    services::{
        account_service::AccountService, auth_service::AuthService,
        organization_service::OrganizationService, project_service::ProjectService,
        task_service::TaskService, user_service::UserService,
    },
    state::AppState,
};

#[derive(Clone)]
pub struct ServiceContext {
    daos: DaoContext,
}

impl ServiceContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self {
            daos: DaoContext::new(db),
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(&state.db)
    }

    pub fn auth<'a>(&self, tokens: &'a TokenIssuer) -> AuthService<'a> {
        AuthService::new(self.daos.clone(), tokens)
    }

    pub fn account<'a>(&self, tokens: &'a TokenIssuer, reset_ttl_secs: u64) -> AccountService<'a> {
        AccountService::new(
            self.daos.clone(),
            tokens,
            Duration::seconds(reset_ttl_secs as i64),
        )
    }

    pub fn project(&self) -> ProjectService {
        ProjectService::new(self.daos.clone())
    }

    pub fn task(&self) -> TaskService {
        TaskService::new(self.daos.clone())
    }

    pub fn organization(&self) -> OrganizationService {
        OrganizationService::new(self.daos.clone())
    }

    pub fn user(&self) -> UserService {
        UserService::new(self.daos.user())
    }
}
