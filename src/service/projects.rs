use tracing::{info, warn};

use crate::config::DbConfig;
use crate::db::{ProjectRecord, ProjectSummary, SessionManager, Statement, query};
use crate::error::PortalError;

pub const INSERT_PROJECT_SQL: &str = "INSERT INTO Projects (ResearcherName, ProjectTitle, CreatedAt) \
     VALUES (@researcherName, @projectTitle, @createdAt)";

/// Newest first; `ProjectId` orders rows that share a timestamp.
pub const LIST_PROJECTS_SQL: &str = "SELECT ResearcherName, ProjectTitle FROM Projects \
     ORDER BY CreatedAt DESC, ProjectId DESC";

pub async fn add_project(
    sessions: &SessionManager,
    cfg: &DbConfig,
    record: ProjectRecord,
) -> Result<(), PortalError> {
    let title = record.project_title.clone();
    let stmt = Statement::new(INSERT_PROJECT_SQL)
        .bind("researcherName", record.researcher_name)
        .bind("projectTitle", record.project_title)
        .bind("createdAt", record.created_at);

    let affected = sessions
        .with_session(cfg, move |session| {
            Box::pin(async move { Ok::<_, PortalError>(query::execute(session, &stmt).await?) })
        })
        .await?;

    info!(%title, affected, "project added");
    Ok(())
}

pub async fn list_projects(
    sessions: &SessionManager,
    cfg: &DbConfig,
) -> Result<Vec<ProjectSummary>, PortalError> {
    let stmt = Statement::new(LIST_PROJECTS_SQL);

    let rows = sessions
        .with_session(cfg, move |session| {
            Box::pin(async move { Ok::<_, PortalError>(query::fetch_all(session, &stmt).await?) })
        })
        .await?;

    let projects = rows
        .into_iter()
        .filter_map(|row| {
            let summary = ProjectSummary::from_row(&row);
            if summary.is_none() {
                warn!(?row, "skipping malformed project row");
            }
            summary
        })
        .collect();
    Ok(projects)
}
