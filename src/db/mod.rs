//! Database layer: one session per request, named-parameter statements,
//! and the transports that carry them.
//!
//! Layout:
//! - `session.rs`: scoped session acquisition and release
//! - `query.rs`: statement execution and row collection
//! - `statement.rs`: `@name` placeholders compiled to driver syntax
//! - `transport.rs`: the driver seam (`Connector`, `Connection`, `RowEvent`)
//! - `mssql.rs` / `sqlite.rs`: concrete transports
//! - `schema.rs`: SQLite DDL for local use

pub mod error;
pub mod models;
pub mod query;
pub mod schema;
pub mod session;
pub mod statement;
pub mod transport;
pub mod value;

#[cfg(feature = "mssql")]
pub mod mssql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;

use crate::config::Driver;

pub use error::{ConnectError, QueryError};
pub use models::{ProjectRecord, ProjectSummary};
pub use session::{Session, SessionManager};
pub use statement::{CompiledStatement, PlaceholderStyle, Statement};
pub use transport::{Connection, Connector, RowEvent};
pub use value::{Params, Row, SqlValue};

/// Pick the transport compiled in for `driver`.
pub fn connector_for(driver: Driver) -> Result<Arc<dyn Connector>, ConnectError> {
    match driver {
        #[cfg(feature = "mssql")]
        Driver::Mssql => Ok(Arc::new(mssql::MssqlConnector)),
        #[cfg(feature = "sqlite")]
        Driver::Sqlite => Ok(Arc::new(sqlite::SqliteConnector)),
        #[allow(unreachable_patterns)]
        other => Err(ConnectError::UnsupportedDriver(other.to_string())),
    }
}
