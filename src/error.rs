use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::db::{ConnectError, QueryError};
use crate::types::StatusBody;

#[derive(Debug, ThisError)]
pub enum PortalError {
    /// Missing or malformed request input.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Query(#[from] QueryError),
}

impl PortalError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Validation(_) => StatusCode::BAD_REQUEST,
            PortalError::Config(_) | PortalError::Connect(_) | PortalError::Query(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        (status, Json(StatusBody::new(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_failures_carry_detail_and_map_to_500() {
        let err = PortalError::from(ConnectError::Transport("refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Database error: connection failed: refused");

        let err = PortalError::from(QueryError::Driver("bad column".into()));
        assert_eq!(err.to_string(), "Database error: query failed: bad column");
    }

    #[test]
    fn incomplete_config_is_500_with_config_message() {
        let err = PortalError::from(ConfigError::Incomplete {
            missing: vec!["DB_SERVER"],
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            err.to_string()
                .starts_with("Database configuration is incomplete")
        );
    }

    #[test]
    fn validation_is_400_and_verbatim() {
        let err = PortalError::Validation("Please provide both a username and a password.".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Please provide both a username and a password.");
    }
}
