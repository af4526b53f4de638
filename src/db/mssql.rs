//! SQL Server / Azure SQL transport over `tiberius`.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use tiberius::{AuthMethod, Client, ColumnData, FromSql, Query, QueryItem};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use super::error::{ConnectError, QueryError};
use super::statement::{CompiledStatement, PlaceholderStyle};
use super::transport::{Connection, Connector, RowEvent};
use super::value::{Row, SqlValue};
use crate::config::DbConfig;

pub type MssqlClient = Client<Compat<TcpStream>>;

/// SQL Server error number for a rejected login.
const LOGIN_FAILED: u32 = 18456;

#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlConnector;

fn build_config(cfg: &DbConfig) -> tiberius::Config {
    let mut config = tiberius::Config::new();
    config.host(&cfg.server);
    config.port(cfg.port);
    config.database(&cfg.database);
    config.authentication(AuthMethod::sql_server(&cfg.user, &cfg.password));
    if cfg.trust_cert {
        config.trust_cert();
    }
    config
}

fn connect_error(e: tiberius::error::Error) -> ConnectError {
    match e {
        tiberius::error::Error::Server(token) if token.code() == LOGIN_FAILED => {
            ConnectError::Authentication(token.message().to_string())
        }
        other => ConnectError::Transport(other.to_string()),
    }
}

async fn handshake(config: tiberius::Config) -> Result<MssqlClient, tiberius::error::Error> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}

#[async_trait]
impl Connector for MssqlConnector {
    fn driver(&self) -> &'static str {
        "mssql"
    }

    async fn connect(&self, cfg: &DbConfig) -> Result<Box<dyn Connection>, ConnectError> {
        let client = match handshake(build_config(cfg)).await {
            Ok(client) => client,
            // Azure SQL gateways may hand the login off to another node.
            Err(tiberius::error::Error::Routing { host, port }) => {
                info!(%host, port, "following SQL Server routing redirect");
                let mut config = build_config(cfg);
                config.host(&host);
                config.port(port);
                handshake(config).await.map_err(connect_error)?
            }
            Err(e) => return Err(connect_error(e)),
        };
        debug!(server = %cfg.server, database = %cfg.database, "sql server login complete");
        Ok(Box::new(MssqlSession {
            client: Some(client),
        }))
    }
}

struct MssqlSession {
    client: Option<MssqlClient>,
}

fn build_query(stmt: &CompiledStatement) -> Query<'_> {
    let mut query = Query::new(stmt.sql.as_str());
    for value in &stmt.values {
        match value {
            SqlValue::Null => query.bind(Option::<&str>::None),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Timestamp(ts) => query.bind(ts.naive_utc()),
        }
    }
    query
}

fn decode_value(data: ColumnData<'static>) -> SqlValue {
    match data {
        ColumnData::U8(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        ColumnData::I16(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        ColumnData::I32(v) => v.map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        ColumnData::I64(v) => v.map_or(SqlValue::Null, SqlValue::Int),
        ColumnData::F32(v) => v.map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))),
        ColumnData::F64(v) => v.map_or(SqlValue::Null, SqlValue::Float),
        ColumnData::Bit(v) => v.map_or(SqlValue::Null, SqlValue::Bool),
        ColumnData::String(v) => v.map_or(SqlValue::Null, |s| SqlValue::Text(s.into_owned())),
        other => match NaiveDateTime::from_sql(&other) {
            Ok(Some(dt)) => SqlValue::Timestamp(dt.and_utc()),
            // GUID, binary, numeric and XML columns are not used here
            _ => SqlValue::Null,
        },
    }
}

fn decode_row(row: tiberius::Row) -> Row {
    Row(row.into_iter().map(decode_value).collect())
}

#[async_trait]
impl Connection for MssqlSession {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::AtP
    }

    fn stream<'a>(&'a mut self, stmt: &'a CompiledStatement) -> BoxStream<'a, RowEvent> {
        let Some(client) = self.client.as_mut() else {
            return stream::iter([RowEvent::Failed(QueryError::SessionClosed.to_string())])
                .boxed();
        };

        stream::once(build_query(stmt).query(client))
            .flat_map(|opened| match opened {
                // the result stream ends once the server's final DONE token is read
                Ok(results) => results
                    .filter_map(|item| {
                        future::ready(match item {
                            Ok(QueryItem::Row(row)) => Some(RowEvent::Row(decode_row(row))),
                            Ok(QueryItem::Metadata(_)) => None,
                            Err(e) => Some(RowEvent::Failed(e.to_string())),
                        })
                    })
                    .chain(stream::iter([RowEvent::Done]))
                    .boxed(),
                Err(e) => stream::iter([RowEvent::Failed(e.to_string())]).boxed(),
            })
            .boxed()
    }

    async fn execute(&mut self, stmt: &CompiledStatement) -> Result<u64, QueryError> {
        let client = self.client.as_mut().ok_or(QueryError::SessionClosed)?;
        let result = build_query(stmt)
            .execute(client)
            .await
            .map_err(|e| QueryError::Driver(e.to_string()))?;
        Ok(result.total())
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        match self.client.take() {
            Some(client) => client
                .close()
                .await
                .map_err(|e| ConnectError::Transport(e.to_string())),
            None => Ok(()),
        }
    }
}
