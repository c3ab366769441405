use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A remote call failed; `message` is what the user gets to see.
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("Not found")]
    NotFound,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    /// Wrap a failed remote call. Logged here, at the call site.
    pub fn remote(message: impl Into<String>, source: StoreError) -> Self {
        let message = message.into();
        error!("{} ({})", message, source);
        AppError::Remote { message, source }
    }

    /// The text a user is shown for this error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Remote { message, .. } => message.clone(),
            AppError::Validation(msg) | AppError::Unauthorized(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::NotFound => "Not Found".to_string(),
            AppError::Store(_) => "Remote store error occurred".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) | AppError::InternalServerError => {
                "Internal server error".to_string()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Remote { .. } => StatusCode::BAD_GATEWAY,
            AppError::Store(e) => {
                error!("remote store error: {}", e);
                StatusCode::BAD_GATEWAY
            }
            AppError::Database(e) => {
                error!("database error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Config(msg) => {
                error!("configuration error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: self.user_message(),
        });

        (status, body).into_response()
    }
}
