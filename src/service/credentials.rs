use std::fmt;
use tracing::info;

use crate::config::DbConfig;
use crate::db::{SessionManager, Statement, query};
use crate::error::PortalError;

/// Existence check against the `Users` table. Passwords are compared as
/// stored (plaintext); hashing is not part of this service.
pub const CREDENTIAL_CHECK_SQL: &str =
    "SELECT COUNT(1) AS UserCount FROM Users WHERE Username = @username AND Password = @password";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Valid,
    Invalid,
}

impl LoginOutcome {
    /// Exactly one matching row is a valid login. No row, several rows, or
    /// an unreadable count are all treated as no match.
    pub fn from_match_count(count: Option<i64>) -> Self {
        match count {
            Some(1) => LoginOutcome::Valid,
            _ => LoginOutcome::Invalid,
        }
    }
}

pub async fn check_credentials(
    sessions: &SessionManager,
    cfg: &DbConfig,
    creds: Credentials,
) -> Result<LoginOutcome, PortalError> {
    let username = creds.username.clone();
    let stmt = Statement::new(CREDENTIAL_CHECK_SQL)
        .bind("username", creds.username)
        .bind("password", creds.password);

    let count = sessions
        .with_session(cfg, move |session| {
            Box::pin(async move { Ok::<_, PortalError>(query::fetch_count(session, &stmt).await?) })
        })
        .await?;

    let outcome = LoginOutcome::from_match_count(count);
    info!(%username, ?outcome, "credential check finished");
    Ok(outcome)
}
