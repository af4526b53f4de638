use axum::{Json, extract::State, http::StatusCode};

use crate::db::{ProjectRecord, ProjectSummary};
use crate::middleware::PortalJson;
use crate::router::PortalState;
use crate::service::projects;
use crate::types::api::present;
use crate::types::{AddProjectRequest, StatusBody};
use crate::PortalError;

pub const MISSING_PROJECT_FIELDS: &str = "Please provide both a researcher name and a project title.";

/// POST /api/add-project -> 201 once the row is inserted.
pub async fn add_project(
    State(state): State<PortalState>,
    PortalJson(req): PortalJson<AddProjectRequest>,
) -> Result<(StatusCode, Json<StatusBody>), PortalError> {
    let (Some(researcher_name), Some(project_title)) =
        (present(req.researcher_name), present(req.project_title))
    else {
        return Err(PortalError::Validation(MISSING_PROJECT_FIELDS.to_string()));
    };

    let cfg = state.db_config()?;
    projects::add_project(
        &state.sessions,
        &cfg,
        ProjectRecord::new(researcher_name, project_title),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(StatusBody::new("Project added successfully!")),
    ))
}

/// GET /api/projects -> every project, newest first.
pub async fn list_projects(
    State(state): State<PortalState>,
) -> Result<Json<Vec<ProjectSummary>>, PortalError> {
    let cfg = state.db_config()?;
    let projects = projects::list_projects(&state.sessions, &cfg).await?;
    Ok(Json(projects))
}
