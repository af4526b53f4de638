use std::time::Duration;
use thiserror::Error as ThisError;

/// Failure to open (or cleanly close) a session.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ConnectError {
    #[error("connection failed: {0}")]
    Transport(String),

    #[error("login failed: {0}")]
    Authentication(String),

    #[error("driver `{0}` is not compiled into this build")]
    UnsupportedDriver(String),
}

/// Failure while a statement runs on an open session.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum QueryError {
    #[error("query failed: {0}")]
    Driver(String),

    #[error("no value bound for parameter @{0}")]
    UnboundParameter(String),

    #[error("parameter @{0} is not referenced by the statement")]
    UnusedParameter(String),

    #[error("row stream ended before the statement completed")]
    Truncated,

    #[error("query did not finish within {0:?}")]
    Timeout(Duration),

    #[error("session is already closed")]
    SessionClosed,
}
