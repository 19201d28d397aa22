use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::models::session::SessionStep;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Identity {0} is not registered")]
    NotRegistered(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot {action} while the session is in the {from} step")]
    InvalidTransition {
        from: SessionStep,
        action: &'static str,
    },

    #[error("Time for the current test has run out")]
    TimeExpired,

    #[error("No tests are assigned to this candidate")]
    NoTestsAssigned,

    #[error("Test {0} has no questions configured")]
    EmptyQuestionSet(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Error::BadRequest(_) | Error::Validation(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::NotRegistered(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidTransition { .. } | Error::TimeExpired => StatusCode::CONFLICT,
            Error::NoTestsAssigned => StatusCode::UNPROCESSABLE_ENTITY,
            Error::EmptyQuestionSet(_) | Error::Config(_) | Error::Internal(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Anyhow(_) => StatusCode::BAD_REQUEST,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
