use futures::FutureExt;
use futures::future::BoxFuture;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::error::{ConnectError, QueryError};
use super::transport::{Connection, Connector};
use crate::config::DbConfig;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One open, exclusive connection owned by a single request.
///
/// Never shared and never reused: once closed, every query on it fails with
/// [`QueryError::SessionClosed`].
pub struct Session {
    id: u64,
    driver: &'static str,
    conn: Option<Box<dyn Connection>>,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub(crate) fn connection(&mut self) -> Result<&mut (dyn Connection + 'static), QueryError> {
        self.conn.as_deref_mut().ok_or(QueryError::SessionClosed)
    }

    /// Release the connection. Calling this on a closed session is a no-op.
    /// Close failures are logged and swallowed.
    pub async fn close(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        match conn.close().await {
            Ok(()) => debug!(session = self.id, driver = self.driver, "session closed"),
            Err(e) => warn!(
                session = self.id,
                driver = self.driver,
                error = %e,
                "session close failed; connection dropped"
            ),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.conn.is_some() {
            warn!(
                session = self.id,
                driver = self.driver,
                "session dropped while still open"
            );
        }
    }
}

/// Opens one session per request and guarantees its release.
#[derive(Clone)]
pub struct SessionManager {
    connector: Arc<dyn Connector>,
    query_timeout: Option<Duration>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            query_timeout: None,
        }
    }

    /// Bound the time a session may take, handshake included. `None` waits
    /// indefinitely.
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Suspends until the transport handshake completes.
    pub async fn open(&self, cfg: &DbConfig) -> Result<Session, ConnectError> {
        let driver = self.connector.driver();
        let conn = self.connector.connect(cfg).await.inspect_err(|e| {
            warn!(driver, server = %cfg.server, database = %cfg.database, error = %e, "connect failed");
        })?;
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(session = id, driver, "session opened");
        Ok(Session {
            id,
            driver,
            conn: Some(conn),
        })
    }

    /// Open a session, run `body` on it, and close it exactly once whether
    /// the body succeeds, fails, times out or panics.
    ///
    /// A connect failure returns before `body` is ever called. The timeout is
    /// one deadline shared by the handshake and the body.
    pub async fn with_session<T, E, F>(&self, cfg: &DbConfig, body: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, Result<T, E>>,
        E: From<ConnectError> + From<QueryError>,
    {
        let deadline = self
            .query_timeout
            .map(|limit| (limit, Instant::now() + limit));

        let mut session = match deadline {
            Some((limit, at)) => match tokio::time::timeout_at(at, self.open(cfg)).await {
                Ok(opened) => opened?,
                Err(_) => {
                    warn!(driver = self.connector.driver(), ?limit, "connect timed out");
                    return Err(QueryError::Timeout(limit).into());
                }
            },
            None => self.open(cfg).await?,
        };
        let session_id = session.id;

        let outcome = {
            let run = AssertUnwindSafe(body(&mut session)).catch_unwind();
            match deadline {
                Some((limit, at)) => match tokio::time::timeout_at(at, run).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(session = session_id, ?limit, "session body timed out");
                        Ok(Err(QueryError::Timeout(limit).into()))
                    }
                },
                None => run.await,
            }
        };

        session.close().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
