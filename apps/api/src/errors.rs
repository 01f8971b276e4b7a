use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const LIMIT_REACHED_MESSAGE: &str = "Limit reached. Upgrade to continue.";
pub const PREMIUM_ONLY_MESSAGE: &str = "This feature is only available for premium subscriptions";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every failure is rendered as `200 OK` with `{"success": false, "message": ...}`;
/// clients branch on `success`, not on the status code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{}", LIMIT_REACHED_MESSAGE)]
    LimitReached,

    #[error("{}", PREMIUM_ONLY_MESSAGE)]
    PremiumOnly,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Image vendor error: {0}")]
    ImageVendor(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// The message shown to the caller.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::LimitReached => LIMIT_REACHED_MESSAGE.to_string(),
            AppError::PremiumOnly => PREMIUM_ONLY_MESSAGE.to_string(),
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Llm(msg) | AppError::ImageVendor(msg) | AppError::Pdf(msg) => msg.clone(),
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Unauthorized(msg) => tracing::warn!("Auth resolution failed: {msg}"),
            AppError::Database(e) => tracing::error!("Database error: {e}"),
            AppError::Llm(msg) => tracing::error!("LLM error: {msg}"),
            AppError::ImageVendor(msg) => tracing::error!("Image vendor error: {msg}"),
            AppError::Pdf(msg) => tracing::error!("PDF error: {msg}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            AppError::LimitReached
            | AppError::PremiumOnly
            | AppError::Validation(_)
            | AppError::NotFound(_) => {}
        }

        let body = Json(json!({
            "success": false,
            "message": self.user_message(),
        }));

        (StatusCode::OK, body).into_response()
    }
}
