use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    auth::{AuthUser, TokenPair},
    middleware::{authenticate, optional_auth},
    response::{ApiResult, JsonApiResponse},
    services::{
        ServiceContext,
        account_service::{
            AccountService, AuthResponse, ChangePasswordRequest, ForgotPasswordRequest,
            LoginRequest, RefreshRequest, RegisterRequest, ResetPasswordRequest,
        },
    },
    state::AppState,
};

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, we've sent a password reset link.";

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub user: Option<AuthUser>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password));

    let authenticated = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    let optional = Router::new()
        .route("/me", get(me))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    Router::new()
        .nest("/auth", public.merge(authenticated).merge(optional))
        .with_state(state)
}

fn account(state: &AppState) -> AccountService<'_> {
    ServiceContext::from_state(state).account(&state.tokens, state.password_reset_ttl_secs())
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let registered = account(&state).register(body).await?;
    JsonApiResponse::created("User registered successfully", registered)
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let session = account(&state).login(body).await?;
    JsonApiResponse::ok_with_message("Login successful", session)
}

async fn logout(State(state): State<Arc<AppState>>, user: AuthUser) -> ApiResult<()> {
    account(&state).logout(user.id).await?;
    JsonApiResponse::message("Logged out successfully")
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<TokenPair> {
    let tokens = account(&state).refresh(body).await?;
    JsonApiResponse::ok(tokens)
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<()> {
    // the answer must not reveal whether the email is registered
    account(&state).forgot_password(body).await?;
    JsonApiResponse::message(FORGOT_PASSWORD_MESSAGE)
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<()> {
    account(&state).reset_password(body).await?;
    JsonApiResponse::message("Password reset successfully")
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    account(&state).change_password(user.id, body).await?;
    JsonApiResponse::message("Password changed successfully")
}

async fn me(user: Option<AuthUser>) -> ApiResult<MeResponse> {
    JsonApiResponse::ok(MeResponse {
        authenticated: user.is_some(),
        user,
    })
}
