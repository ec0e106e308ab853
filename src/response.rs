use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AppError, FieldError};

pub type ApiResult<T> = Result<JsonApiResponse<T>, AppError>;

const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize)]
pub struct JsonApiResponse<T: Serialize> {
    #[serde(skip)]
    pub status: u16,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T: Serialize> JsonApiResponse<T> {
    pub fn ok(data: T) -> ApiResult<T> {
        Ok(Self {
            status: StatusCode::OK.as_u16(),
            success: true,
            message: None,
            data: Some(data),
            errors: None,
        })
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> ApiResult<T> {
        Self::with_status(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> ApiResult<T> {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> ApiResult<T> {
        Ok(Self {
            status: status.as_u16(),
            success: true,
            message: Some(message.into()),
            data: Some(data),
            errors: None,
        })
    }
}

impl JsonApiResponse<()> {
    /// Success envelope without a `data` member.
    pub fn message(message: impl Into<String>) -> ApiResult<()> {
        Ok(Self {
            status: StatusCode::OK.as_u16(),
            success: true,
            message: Some(message.into()),
            data: None,
            errors: None,
        })
    }

    pub(crate) fn from_error(err: &AppError) -> Self {
        let status = status_for(err);
        let message = match err {
            AppError::Internal(_) if !cfg!(debug_assertions) => {
                GENERIC_INTERNAL_MESSAGE.to_string()
            }
            _ => err.message().to_string(),
        };
        let errors = match err {
            AppError::Validation(fields) => Some(fields.clone()),
            _ => None,
        };

        Self {
            status: status.as_u16(),
            success: false,
            message: Some(message),
            data: None,
            errors,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            log_app_error(&self, status);
        }
        JsonApiResponse::from_error(&self).into_response()
    }
}

impl<T: Serialize> IntoResponse for JsonApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

pub(crate) fn log_app_error(err: &AppError, status: StatusCode) {
    tracing::error!(status = status.as_u16(), error = %err.message(), "request failed");
}

pub(crate) fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::Forbidden(_) => StatusCode::FORBIDDEN,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
