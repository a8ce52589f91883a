use thiserror::Error;
use uuid::Uuid;
use axum::http::StatusCode;

use crate::{error::HttpError, service::permissions::RecordKind};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} {1} not found")]
    NotFound(RecordKind, Uuid),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("Messaging requires an assigned, in-process or completed request between both users")]
    NoQualifyingEngagement,

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_, _) | ServiceError::UserNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Forbidden(_) | ServiceError::NoQualifyingEngagement => StatusCode::FORBIDDEN,

            ServiceError::InvalidState(_) | ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,

            ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        let status = error.status_code();
        match error {
            // Store details stay in the logs
            ServiceError::Database(e) => {
                tracing::error!("database error: {}", e);
                HttpError::server_error("Server Error. Please try again later")
            }
            other => HttpError::new(other.to_string(), status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_kind_to_its_status() {
        let id = Uuid::new_v4();
        let cases = [
            (ServiceError::NotFound(RecordKind::DirectRequest, id), StatusCode::NOT_FOUND),
            (ServiceError::UserNotFound(id), StatusCode::NOT_FOUND),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::NoQualifyingEngagement, StatusCode::FORBIDDEN),
            (ServiceError::InvalidState("late".into()), StatusCode::BAD_REQUEST),
            (ServiceError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(HttpError::from(error).status, status);
        }
    }

    #[test]
    fn database_details_are_not_exposed() {
        let err = HttpError::from(ServiceError::Database(sqlx::Error::PoolTimedOut));
        assert!(!err.message.contains("pool"));
    }
}
