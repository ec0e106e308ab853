use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

use super::{auth, health, organizations, projects, tasks, users};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(organizations::router(state.clone()))
        .merge(projects::router(state.clone()))
        .merge(tasks::router(state))
}
