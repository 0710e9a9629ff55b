use crate::models::Envelope;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("requested page {page} exceeds total pages ({total_pages})")]
    PageOutOfRange { page: i64, total_pages: i64 },

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no verses matching {0:?} found")]
    NoMatches(String),

    #[error("request timed out")]
    Timeout,

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse classification used to pick a status code at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Timeout,
    Internal,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidRequest(_)
            | ServiceError::PageOutOfRange { .. }
            | ServiceError::NoFieldsToUpdate => ErrorKind::Validation,
            ServiceError::NotFound(_) | ServiceError::NoMatches(_) => ErrorKind::NotFound,
            ServiceError::Timeout => ErrorKind::Timeout,
            ServiceError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            // Search is the only endpoint that surfaces absence as 404.
            ErrorKind::NotFound if matches!(self, ServiceError::NoMatches(_)) => {
                StatusCode::NOT_FOUND
            }
            ErrorKind::NotFound => StatusCode::BAD_REQUEST,
            ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Adapter for `map_err` that wraps a diesel failure with `context`.
    pub fn database(context: &'static str) -> impl FnOnce(diesel::result::Error) -> Self {
        move |err| ServiceError::Internal(anyhow::Error::new(err).context(context))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self.kind() {
            ErrorKind::Internal => error!(error = %self, %status, "request failed"),
            _ => warn!(error = %self, %status, "request rejected"),
        }

        let body = Envelope::<()>::error(self.to_string());
        (status, Json(body)).into_response()
    }
}
