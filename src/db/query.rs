//! Statement execution over an open [`Session`].

use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use super::error::QueryError;
use super::session::Session;
use super::statement::Statement;
use super::transport::RowEvent;
use super::value::Row;

/// Run a statement that returns no rows. Resolves to the rows affected.
pub async fn execute(session: &mut Session, stmt: &Statement) -> Result<u64, QueryError> {
    let session_id = session.id();
    let conn = session.connection()?;
    let compiled = stmt.compile(conn.placeholder_style())?;
    let affected = conn.execute(&compiled).await.inspect_err(|e| {
        warn!(session = session_id, error = %e, "statement failed");
    })?;
    debug!(session = session_id, affected, "statement completed");
    Ok(affected)
}

/// Run a row-returning statement and buffer every row until completion.
pub async fn fetch_all(session: &mut Session, stmt: &Statement) -> Result<Vec<Row>, QueryError> {
    let session_id = session.id();
    let conn = session.connection()?;
    let compiled = stmt.compile(conn.placeholder_style())?;
    let rows = collect_rows(conn.stream(&compiled)).await.inspect_err(|e| {
        warn!(session = session_id, error = %e, "query failed");
    })?;
    debug!(session = session_id, rows = rows.len(), "query completed");
    Ok(rows)
}

/// Run a single-row aggregate such as `COUNT(1)` and read its first column.
///
/// An empty result, or a first column that is not an integer, yields
/// `Ok(None)` rather than an error.
pub async fn fetch_count(
    session: &mut Session,
    stmt: &Statement,
) -> Result<Option<i64>, QueryError> {
    let rows = fetch_all(session, stmt).await?;
    Ok(first_int(&rows))
}

pub fn first_int(rows: &[Row]) -> Option<i64> {
    rows.first()?.get(0)?.as_int()
}

/// Accumulate rows in arrival order until a terminal marker.
///
/// `Failed` wins even when rows already arrived; a stream that ends without
/// any terminal marker is [`QueryError::Truncated`].
pub async fn collect_rows<S>(events: S) -> Result<Vec<Row>, QueryError>
where
    S: Stream<Item = RowEvent>,
{
    let mut events = std::pin::pin!(events);
    let mut rows = Vec::new();
    while let Some(event) = events.next().await {
        match event {
            RowEvent::Row(row) => rows.push(row),
            RowEvent::Failed(msg) => return Err(QueryError::Driver(msg)),
            RowEvent::Done => return Ok(rows),
        }
    }
    Err(QueryError::Truncated)
}
