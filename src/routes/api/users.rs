use std::sync::Arc;

use axum::{Json, Router, extract::State, middleware, routing::get};

use crate::{
    auth::AuthUser,
    middleware::authenticate,
    response::{ApiResult, JsonApiResponse},
    services::{
        ServiceContext,
        user_service::{UpdateProfileRequest, UserView},
    },
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    let users = Router::new()
        .route("/profile", get(profile).put(update_profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new().nest("/users", users).with_state(state)
}

async fn profile(State(state): State<Arc<AppState>>, user: AuthUser) -> ApiResult<UserView> {
    let profile = ServiceContext::from_state(&state).user().profile(user.id).await?;
    JsonApiResponse::ok(profile)
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> ApiResult<UserView> {
    let profile = ServiceContext::from_state(&state)
        .user()
        .update_profile(user.id, body)
        .await?;
    JsonApiResponse::ok_with_message("Profile updated successfully", profile)
}
