use std::sync::Arc;

use anyhow::Context;
use sea_orm::DatabaseConnection;

use crate::{
    auth::TokenIssuer,
    config::{AppConfig, AuthConfig},
};

pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthConfig,
    pub tokens: TokenIssuer,
    pub db: DatabaseConnection,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Arc<Self>> {
        let auth = config
            .auth
            .clone()
            .context("auth configuration is required (APP_AUTH__JWT_SECRET)")?;
        let tokens = TokenIssuer::from_config(&auth);

        Ok(Arc::new(Self {
            config,
            auth,
            tokens,
            db,
        }))
    }

    pub fn password_reset_ttl_secs(&self) -> u64 {
        self.auth.password_reset_ttl_secs
    }
}
