//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` enum for all error conditions and implements Axum's
//! `IntoResponse` to automatically convert errors to appropriate HTTP responses
//! with JSON error bodies.
//!
//! Error mappings:
//! - `Validation` → 400 (warning)
//! - `SessionNotFound`, `BuildFolderNotFound` → 404
//! - `Conflict` → 409 (warning)
//! - `Fetch` → 502
//! - `Io`, `Archive`, `Config`, `Internal` → 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::NoticeLevel;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Git error: {}", .0.message())]
    Fetch(#[from] git2::Error),

    #[error("No build folder found for {project_type}. Expected one of: {}", .candidates.join(", "))]
    BuildFolderNotFound {
        project_type: String,
        candidates: Vec<String>,
    },

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
            AppError::BuildFolderNotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Io(_) | AppError::Archive(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// How the page should present this error.
    pub fn level(&self) -> NoticeLevel {
        match self {
            AppError::Validation(_) | AppError::Conflict(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        }
    }

    pub fn lock_poisoned() -> Self {
        AppError::Internal("Lock poisoned".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "level": self.level(),
        }));

        (self.status_code(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
