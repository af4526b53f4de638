//! Shared fixtures: a scriptable in-memory transport that counts every
//! connect and close, plus helpers for driving the router.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use research_portal::config::{DbConfig, RawDbSettings, StaticDbConfig};
use research_portal::db::{
    CompiledStatement, ConnectError, Connection, Connector, PlaceholderStyle, QueryError, Row,
    RowEvent, SessionManager,
};
use research_portal::router::{PortalState, portal_router};

#[derive(Debug, Default)]
pub struct Counters {
    pub connect_attempts: AtomicUsize,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub statements: Mutex<Vec<CompiledStatement>>,
}

impl Counters {
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> Vec<CompiledStatement> {
        self.statements.lock().unwrap().clone()
    }
}

/// What every connection opened by a [`FakeConnector`] does.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Row statements yield these rows then complete; others affect one row.
    Rows(Vec<Row>),
    /// Yield these rows, then report a statement failure.
    FailQuery { rows: Vec<Row>, message: String },
    /// The handshake itself fails.
    FailConnect(String),
    /// The handshake never completes.
    HangConnect,
    /// Statements never finish.
    Hang,
    /// Statements succeed with no rows, but closing reports an error.
    FailClose,
}

#[derive(Debug, Clone)]
pub struct FakeConnector {
    pub counters: Arc<Counters>,
    behavior: Behavior,
}

impl FakeConnector {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            behavior,
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    fn driver(&self) -> &'static str {
        "fake"
    }

    async fn connect(&self, _cfg: &DbConfig) -> Result<Box<dyn Connection>, ConnectError> {
        self.counters.connect_attempts.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::FailConnect(msg) => return Err(ConnectError::Transport(msg.clone())),
            Behavior::HangConnect => std::future::pending::<()>().await,
            _ => {}
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            counters: self.counters.clone(),
            behavior: self.behavior.clone(),
            closed: false,
        }))
    }
}

struct FakeConnection {
    counters: Arc<Counters>,
    behavior: Behavior,
    closed: bool,
}

impl FakeConnection {
    fn record(&self, stmt: &CompiledStatement) {
        self.counters.statements.lock().unwrap().push(stmt.clone());
    }
}

#[async_trait]
impl Connection for FakeConnection {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::AtP
    }

    fn stream<'a>(&'a mut self, stmt: &'a CompiledStatement) -> BoxStream<'a, RowEvent> {
        self.record(stmt);
        match &self.behavior {
            Behavior::Rows(rows) => stream::iter(rows.clone())
                .map(RowEvent::Row)
                .chain(stream::iter([RowEvent::Done]))
                .boxed(),
            Behavior::FailQuery { rows, message } => stream::iter(rows.clone())
                .map(RowEvent::Row)
                .chain(stream::iter([RowEvent::Failed(message.clone())]))
                .boxed(),
            Behavior::Hang => stream::pending().boxed(),
            Behavior::FailClose | Behavior::FailConnect(_) | Behavior::HangConnect => {
                stream::iter([RowEvent::Done]).boxed()
            }
        }
    }

    async fn execute(&mut self, stmt: &CompiledStatement) -> Result<u64, QueryError> {
        self.record(stmt);
        match &self.behavior {
            Behavior::FailQuery { message, .. } => Err(QueryError::Driver(message.clone())),
            Behavior::Hang => std::future::pending().await,
            _ => Ok(1),
        }
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::FailClose => Err(ConnectError::Transport("socket reset".into())),
            _ => Ok(()),
        }
    }
}

pub fn complete_settings(database: &str) -> RawDbSettings {
    RawDbSettings {
        server: Some("localhost".into()),
        user: Some("portal".into()),
        password: Some("portal-pass".into()),
        name: Some(database.into()),
        port: None,
        trust_cert: None,
    }
}

pub fn db_config() -> DbConfig {
    DbConfig::from_raw(complete_settings("research")).expect("complete settings")
}

pub fn fake_router(connector: &FakeConnector) -> Router {
    router_with(
        Arc::new(connector.clone()),
        StaticDbConfig(complete_settings("research")),
    )
}

pub fn router_with(connector: Arc<dyn Connector>, settings: StaticDbConfig) -> Router {
    let state = PortalState::new(SessionManager::new(connector), Arc::new(settings));
    portal_router(state)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");
    send_request(app, request).await
}

pub async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.expect("request failed");
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let json = serde_json::from_slice(&body).expect("response body was not JSON");
    (status, json)
}
