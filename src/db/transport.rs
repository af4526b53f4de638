//! The seam between the session/query protocol and a concrete driver.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::error::{ConnectError, QueryError};
use super::statement::{CompiledStatement, PlaceholderStyle};
use super::value::Row;
use crate::config::DbConfig;

/// The three signals a row-returning statement produces.
///
/// A well-formed stream is zero or more `Row`s followed by exactly one
/// terminal marker (`Done` or `Failed`). Anything after the first terminal
/// marker is ignored by consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum RowEvent {
    Row(Row),
    Failed(String),
    Done,
}

/// Opens fresh connections. One instance is shared by every request.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Short driver name, used in logs.
    fn driver(&self) -> &'static str;

    async fn connect(&self, cfg: &DbConfig) -> Result<Box<dyn Connection>, ConnectError>;
}

/// A single open connection, exclusively owned by one session.
#[async_trait]
pub trait Connection: Send {
    fn placeholder_style(&self) -> PlaceholderStyle;

    /// Run a row-returning statement, yielding rows as they arrive.
    fn stream<'a>(&'a mut self, stmt: &'a CompiledStatement) -> BoxStream<'a, RowEvent>;

    /// Run a statement that returns no rows; resolves to rows affected.
    async fn execute(&mut self, stmt: &CompiledStatement) -> Result<u64, QueryError>;

    /// Consume the underlying handle. Implementations must tolerate being
    /// asked twice.
    async fn close(&mut self) -> Result<(), ConnectError>;
}
