pub mod login;
pub mod projects;

use axum::Json;

use crate::types::StatusBody;

/// GET /api/health -> liveness only; never touches the database.
pub async fn health() -> Json<StatusBody> {
    Json(StatusBody::new("ok"))
}
