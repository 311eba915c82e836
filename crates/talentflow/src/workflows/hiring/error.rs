use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::domain::{ApplicationId, CompanyId, Stage};
use super::lifecycle::TransitionError;
use super::repository::RepositoryError;

/// Caller-visible failures. Every variant aborts the operation before any write.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid stage transition from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },
    #[error("rejecting an application requires a decline_reason or decline_details")]
    MissingDeclineReason,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no recruiter available for company {0}")]
    NoRecruiterAvailable(CompanyId),
    #[error("application {application_id} left stage {expected} before the write (now {actual})")]
    TransitionConflict {
        application_id: ApplicationId,
        expected: Stage,
        actual: Stage,
    },
    #[error(transparent)]
    Repository(RepositoryError),
}

impl PipelineError {
    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Stable machine-readable kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            PipelineError::NotFound(_) => "not_found",
            PipelineError::Forbidden(_) => "forbidden",
            PipelineError::InvalidTransition { .. } => "invalid_transition",
            PipelineError::MissingDeclineReason => "missing_decline_reason",
            PipelineError::InvalidInput(_) => "invalid_input",
            PipelineError::NoRecruiterAvailable(_) => "no_recruiter_available",
            PipelineError::TransitionConflict { .. } => "transition_conflict",
            PipelineError::Repository(_) => "repository",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::Forbidden(_) => StatusCode::FORBIDDEN,
            PipelineError::InvalidTransition { .. } | PipelineError::TransitionConflict { .. } => {
                StatusCode::CONFLICT
            }
            PipelineError::MissingDeclineReason | PipelineError::InvalidInput(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            PipelineError::NoRecruiterAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            PipelineError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            PipelineError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a failed conditional stage write onto the caller-visible conflict.
    pub(crate) fn from_stage_write(id: &ApplicationId, err: RepositoryError) -> Self {
        match err {
            RepositoryError::StageMismatch { expected, actual } => {
                PipelineError::TransitionConflict {
                    application_id: id.clone(),
                    expected,
                    actual,
                }
            }
            other => PipelineError::Repository(other),
        }
    }
}

impl From<RepositoryError> for PipelineError {
    fn from(value: RepositoryError) -> Self {
        Self::Repository(value)
    }
}

impl From<TransitionError> for PipelineError {
    fn from(value: TransitionError) -> Self {
        match value {
            TransitionError::InvalidTransition { from, to } => {
                PipelineError::InvalidTransition { from, to }
            }
            TransitionError::MissingDeclineReason => PipelineError::MissingDeclineReason,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
