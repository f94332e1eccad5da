use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::views;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("restaurant search error: {0}")]
    Search(String),

    #[error("messaging error: {0}")]
    Messaging(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong on our side. Please try again.".to_string(),
            ),
            AppError::Search(_) => (
                StatusCode::BAD_GATEWAY,
                "We couldn't reach the restaurant search service.".to_string(),
            ),
            AppError::Messaging(_) => (
                StatusCode::BAD_GATEWAY,
                "We couldn't send a text message right now.".to_string(),
            ),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found.")),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Html(views::error_page(status, &message))).into_response()
    }
}
