use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by attendance operations.
#[derive(Debug, Error)]
pub enum AttendanceError {
    /// The one-check-in-per-day rule would be violated.
    #[error("{0}")]
    Conflict(String),

    /// The operation is out of order for the day's current state.
    #[error("{0}")]
    State(String),

    #[error("start_date {start} cannot be after end_date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// The range is valid but would expand into more work than allowed.
    #[error("{what} requested ({requested}) exceeds the limit of {limit}")]
    RangeTooLarge {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// Missing or unusable bearer credentials.
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Authorization(String),

    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl AttendanceError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    /// Connectivity and pool timeouts; the only failures worth retrying, and
    /// only for reads.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AttendanceError::Store(sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
        )
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Conflict(_) => StatusCode::CONFLICT,
            AttendanceError::State(_)
            | AttendanceError::InvalidRange { .. }
            | AttendanceError::RangeTooLarge { .. } => StatusCode::BAD_REQUEST,
            AttendanceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AttendanceError::Authorization(_) => StatusCode::FORBIDDEN,
            AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AttendanceError::Store(e) => {
                tracing::error!(error = %e, "Attendance store failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
