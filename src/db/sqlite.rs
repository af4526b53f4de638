use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{
    Column, ConnectOptions, Either, Executor, Row as _, Sqlite, SqliteConnection, TypeInfo,
    ValueRef,
};
use tracing::debug;

use super::error::{ConnectError, QueryError};
use super::statement::{CompiledStatement, PlaceholderStyle};
use super::transport::{Connection, Connector, RowEvent};
use super::value::{Row, SqlValue};
use crate::config::DbConfig;

/// Fixed width, so the lexical order of stored timestamps is chronological.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Local SQLite backend. `DbConfig::database` is the database file path;
/// server, user and password are not used by this driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

#[async_trait]
impl Connector for SqliteConnector {
    fn driver(&self) -> &'static str {
        "sqlite"
    }

    async fn connect(&self, cfg: &DbConfig) -> Result<Box<dyn Connection>, ConnectError> {
        let conn = SqliteConnectOptions::new()
            .filename(&cfg.database)
            .create_if_missing(true)
            .connect()
            .await
            .map_err(|e| ConnectError::Transport(e.to_string()))?;
        debug!(path = %cfg.database, "sqlite connection established");
        Ok(Box::new(SqliteSession { conn: Some(conn) }))
    }
}

struct SqliteSession {
    conn: Option<SqliteConnection>,
}

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn build_query(stmt: &CompiledStatement) -> SqliteQuery<'_> {
    stmt.values
        .iter()
        .fold(sqlx::query(&stmt.sql), |q, value| match value {
            SqlValue::Null => q.bind(None::<String>),
            SqlValue::Bool(b) => q.bind(*b),
            SqlValue::Int(i) => q.bind(*i),
            SqlValue::Float(f) => q.bind(*f),
            SqlValue::Text(s) => q.bind(s.as_str()),
            SqlValue::Timestamp(ts) => q.bind(ts.format(TIMESTAMP_FORMAT).to_string()),
        })
}

fn decode_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut values = Vec::with_capacity(row.columns().len());
    for column in row.columns() {
        let idx = column.ordinal();
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            values.push(SqlValue::Null);
            continue;
        }
        // storage class of the value, not the declared column type
        let value = match raw.type_info().name() {
            "INTEGER" => SqlValue::Int(row.try_get(idx)?),
            "REAL" => SqlValue::Float(row.try_get(idx)?),
            "BLOB" => {
                let bytes: Vec<u8> = row.try_get(idx)?;
                SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => SqlValue::Text(row.try_get(idx)?),
        };
        values.push(value);
    }
    Ok(Row(values))
}

#[async_trait]
impl Connection for SqliteSession {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Numbered
    }

    fn stream<'a>(&'a mut self, stmt: &'a CompiledStatement) -> BoxStream<'a, RowEvent> {
        let Some(conn) = self.conn.as_mut() else {
            return stream::iter([RowEvent::Failed(QueryError::SessionClosed.to_string())])
                .boxed();
        };

        // sqlx reports statement completion as `Either::Left(result)`
        conn.fetch_many(build_query(stmt))
            .map(|item| match item {
                Ok(Either::Right(row)) => match decode_row(&row) {
                    Ok(row) => RowEvent::Row(row),
                    Err(e) => RowEvent::Failed(e.to_string()),
                },
                Ok(Either::Left(_)) => RowEvent::Done,
                Err(e) => RowEvent::Failed(e.to_string()),
            })
            .boxed()
    }

    async fn execute(&mut self, stmt: &CompiledStatement) -> Result<u64, QueryError> {
        let conn = self.conn.as_mut().ok_or(QueryError::SessionClosed)?;
        let result = conn
            .execute(build_query(stmt))
            .await
            .map_err(|e| QueryError::Driver(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        match self.conn.take() {
            Some(conn) => sqlx::Connection::close(conn)
                .await
                .map_err(|e| ConnectError::Transport(e.to_string())),
            None => Ok(()),
        }
    }
}
