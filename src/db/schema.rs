//! SQL DDL for a local SQLite database.
//!
//! The SQL Server deployment owns its schema; these tables mirror it so the
//! portal can run against a file on disk.

use super::error::QueryError;
use super::query;
use super::session::Session;
use super::statement::Statement;

/// SQLite schema with:
/// - `Users`: plaintext credentials, unique by `Username`
/// - `Projects`: `ProjectId` breaks ties between equal `CreatedAt` values
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS Users (
    UserId INTEGER PRIMARY KEY AUTOINCREMENT,
    Username TEXT NOT NULL UNIQUE,
    Password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS Projects (
    ProjectId INTEGER PRIMARY KEY AUTOINCREMENT,
    ResearcherName TEXT NOT NULL,
    ProjectTitle TEXT NOT NULL,
    CreatedAt TEXT NOT NULL -- fixed-width UTC timestamp
);

CREATE INDEX IF NOT EXISTS idx_projects_created_at ON Projects(CreatedAt);
"#;

/// Create the tables if they do not exist yet.
pub async fn init_schema(session: &mut Session) -> Result<(), QueryError> {
    // one statement per call; the driver prepares statements individually
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        query::execute(session, &Statement::new(s)).await?;
    }
    Ok(())
}
