use axum::{Json, extract::State, http::StatusCode};

use crate::middleware::PortalJson;
use crate::router::PortalState;
use crate::service::credentials::{self, Credentials, LoginOutcome};
use crate::types::api::present;
use crate::types::{LoginRequest, StatusBody};
use crate::PortalError;

pub const MISSING_CREDENTIALS: &str = "Please provide both a username and a password.";

/// POST /api/test-login-db -> 200 on exactly one matching user, 401 otherwise.
pub async fn test_login_db(
    State(state): State<PortalState>,
    PortalJson(req): PortalJson<LoginRequest>,
) -> Result<(StatusCode, Json<StatusBody>), PortalError> {
    let (Some(username), Some(password)) = (present(req.username), present(req.password)) else {
        return Err(PortalError::Validation(MISSING_CREDENTIALS.to_string()));
    };

    let cfg = state.db_config()?;
    let creds = Credentials { username, password };

    let response = match credentials::check_credentials(&state.sessions, &cfg, creds).await? {
        LoginOutcome::Valid => (StatusCode::OK, Json(StatusBody::new("Login Successful"))),
        LoginOutcome::Invalid => (
            StatusCode::UNAUTHORIZED,
            Json(StatusBody::new("Invalid Credentials")),
        ),
    };
    Ok(response)
}
