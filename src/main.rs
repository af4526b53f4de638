use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use research_portal::config::{CONFIG, DbConfig, Driver, EnvDbConfig};
use research_portal::db::{self, SessionManager, schema};
use research_portal::PortalError;
use research_portal::router::{PortalState, app_router};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &*CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        driver = %cfg.driver,
        port = cfg.port,
        public_dir = %cfg.public_dir.display(),
        query_timeout_secs = ?cfg.query_timeout_secs,
        loglevel = %cfg.loglevel
    );

    let sessions =
        SessionManager::new(db::connector_for(cfg.driver)?).with_query_timeout(cfg.query_timeout());

    if cfg.driver == Driver::Sqlite {
        bootstrap_sqlite(&sessions).await;
    }

    let state = PortalState::new(sessions, Arc::new(EnvDbConfig));
    let app = app_router(state, &cfg.public_dir);

    let addr = cfg.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Create the local tables. Failures are logged; requests will report them.
async fn bootstrap_sqlite(sessions: &SessionManager) {
    let db_cfg = match DbConfig::resolve(&EnvDbConfig) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "skipping sqlite schema setup");
            return;
        }
    };
    let result = sessions
        .with_session(&db_cfg, |session| {
            Box::pin(async move { Ok::<_, PortalError>(schema::init_schema(session).await?) })
        })
        .await;
    match result {
        Ok(()) => info!(path = %db_cfg.database, "sqlite schema ready"),
        Err(e) => warn!(error = %e, "sqlite schema setup failed"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
