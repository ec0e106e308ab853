use sea_orm::{Set, prelude::DateTimeWithTimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::dao::{DaoBase, DaoLayerError, UserDao},
    db::entities::user,
    error::{AppError, validate_with},
};

/// Public shape of a user account. Never carries credentials or reset state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub title: Option<String>,
    pub timezone: String,
    pub locale: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub last_login_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl From<user::Model> for UserView {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            avatar_url: model.avatar_url,
            title: model.title,
            timezone: model.timezone,
            locale: model.locale,
            email_verified: model.email_verified,
            is_active: model.is_active,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Compact user reference embedded in project and task payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
}

impl From<&user::Model> for UserSummary {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
            avatar_url: model.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(rename = "firstName")]
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: Option<String>,
    #[serde(rename = "avatarUrl")]
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar_url: Option<String>,
    #[validate(length(max = 100, message = "Title cannot exceed 100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Timezone must be 1-64 characters"))]
    pub timezone: Option<String>,
    #[validate(length(min = 2, max = 10, message = "Locale must be 2-10 characters"))]
    pub locale: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    user_dao: UserDao,
}

impl UserService {
    pub fn new(user_dao: UserDao) -> Self {
        Self { user_dao }
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserView, AppError> {
        let user = self.user_dao.find_by_id(user_id).await.map_err(user_not_found)?;
        Ok(user.into())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        body: UpdateProfileRequest,
    ) -> Result<UserView, AppError> {
        validate_with(&body, Vec::new())?;

        let user = self
            .user_dao
            .update(user_id, move |active| {
                if let Some(first_name) = body.first_name {
                    active.first_name = Set(first_name.trim().to_string());
                }
                if let Some(last_name) = body.last_name {
                    active.last_name = Set(last_name.trim().to_string());
                }
                if let Some(avatar_url) = body.avatar_url {
                    active.avatar_url = Set(Some(avatar_url));
                }
                if let Some(title) = body.title {
                    active.title = Set(Some(title));
                }
                if let Some(timezone) = body.timezone {
                    active.timezone = Set(timezone);
                }
                if let Some(locale) = body.locale {
                    active.locale = Set(locale);
                }
            })
            .await
            .map_err(user_not_found)?;

        tracing::info!(user_id = %user.id, "profile updated");
        Ok(user.into())
    }
}

fn user_not_found(err: DaoLayerError) -> AppError {
    match err {
        DaoLayerError::NotFound { .. } => AppError::not_found("User not found"),
        other => other.into(),
    }
}
