use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;

/// Outcome of a rejected reconciliation, or a storage failure that was not ours to handle.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Unsupported option: {0}")]
    UnsupportedOption(String),
    #[error("storage error: {0}")]
    Storage(#[from] DbErr),
}

pub type TriageResult<T> = Result<T, TriageError>;

impl TriageError {
    pub fn validation(message: impl Into<String>) -> Self {
        TriageError::Validation(vec![message.into()])
    }

    /// User-facing messages. Storage failures are not described to callers.
    pub fn errors(&self) -> Vec<String> {
        match self {
            TriageError::Validation(errors) => errors.clone(),
            TriageError::Storage(_) => vec!["Internal storage error".to_string()],
            other => vec![other.to_string()],
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            TriageError::Validation(_) | TriageError::UnsupportedOption(_) => {
                StatusCode::BAD_REQUEST
            }
            TriageError::NotFound(_) => StatusCode::NOT_FOUND,
            TriageError::Conflict(_) => StatusCode::CONFLICT,
            TriageError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the rejection counter and request spans.
    pub fn kind(&self) -> &'static str {
        match self {
            TriageError::Validation(_) => "validation",
            TriageError::NotFound(_) => "not_found",
            TriageError::Conflict(_) => "conflict",
            TriageError::UnsupportedOption(_) => "unsupported_option",
            TriageError::Storage(_) => "storage",
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TriageError::Storage(_))
    }
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl IntoResponse for TriageError {
    fn into_response(self) -> Response {
        if self.is_recoverable() {
            tracing::warn!(kind = self.kind(), "Triage request rejected: {}", self);
        } else {
            tracing::error!(kind = self.kind(), "Triage operation failed: {}", self);
        }
        crate::metrics::increment_rejections(self.kind());
        tracing::Span::current().record("error", tracing::field::display(&self));

        let body = json!({ "errors": self.errors().join(", ") });
        (self.status_code(), Json(body)).into_response()
    }
}
