use axum::{
    Router,
    routing::{get, post},
};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::{ConfigError, DbConfig, DbConfigSource};
use crate::db::SessionManager;
use crate::handlers;

/// Shared, read-only state handed to every handler. Holds no connection:
/// each request opens and closes its own session.
#[derive(Clone)]
pub struct PortalState {
    pub sessions: SessionManager,
    db_source: Arc<dyn DbConfigSource>,
}

impl PortalState {
    pub fn new(sessions: SessionManager, db_source: Arc<dyn DbConfigSource>) -> Self {
        Self {
            sessions,
            db_source,
        }
    }

    /// Resolve the database settings for the current request.
    pub fn db_config(&self) -> Result<DbConfig, ConfigError> {
        DbConfig::resolve(self.db_source.as_ref()).inspect_err(|e| {
            warn!(error = %e, "database settings unavailable");
        })
    }
}

/// API routes only.
pub fn portal_router(state: PortalState) -> Router {
    Router::new()
        .route("/api/test-login-db", post(handlers::login::test_login_db))
        .route("/api/add-project", post(handlers::projects::add_project))
        .route("/api/projects", get(handlers::projects::list_projects))
        .route("/api/health", get(handlers::health))
        .with_state(state)
}

/// API routes, the front-end directory for every other path, and request
/// tracing.
pub fn app_router(state: PortalState, public_dir: impl AsRef<Path>) -> Router {
    portal_router(state)
        .fallback_service(ServeDir::new(public_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
}
