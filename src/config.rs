use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error as ThisError;

/// Process-wide server settings, loaded once at start-up.
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().unwrap_or_else(|e| {
        eprintln!("invalid PORTAL_* configuration, falling back to defaults: {e}");
        Config::default()
    })
});

/// Which relational transport serves the per-request sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    Mssql,
    Sqlite,
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Driver::Mssql => f.write_str("mssql"),
            Driver::Sqlite => f.write_str("sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    pub port: u16,
    pub loglevel: String,
    pub public_dir: PathBuf,
    pub driver: Driver,
    pub query_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 8080,
            loglevel: "info".to_string(),
            public_dir: PathBuf::from("public"),
            driver: Driver::Mssql,
            query_timeout_secs: None,
        }
    }
}

impl Config {
    /// Defaults, then `PORT` (App Service convention), then `PORTAL_*`.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(&["PORT"]))
            .merge(Env::prefixed("PORTAL_"))
            .extract()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.listen_addr, self.port).parse()
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ConfigError {
    #[error("Database configuration is incomplete. Missing: {}", missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    #[error("Database configuration is invalid: {0}")]
    Invalid(String),
}

/// Connection parameters for one database session.
#[derive(Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub server: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
    /// Accept the server certificate without validation (local SQL Server).
    pub trust_cert: bool,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("server", &self.server)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .field("trust_cert", &self.trust_cert)
            .finish()
    }
}

/// Raw, possibly incomplete settings as they come out of a provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDbSettings {
    pub server: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub port: Option<u16>,
    pub trust_cert: Option<bool>,
}

pub const DEFAULT_MSSQL_PORT: u16 = 1433;

/// Supplies a fresh view of the database settings every time it is asked.
pub trait DbConfigSource: Send + Sync {
    fn figment(&self) -> Figment;
}

/// Reads `DB_SERVER`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_PORT` and
/// `DB_TRUST_CERT` from the process environment at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvDbConfig;

impl DbConfigSource for EnvDbConfig {
    fn figment(&self) -> Figment {
        // text settings are taken verbatim: `007` or `true` is a valid password
        let text = RawDbSettings {
            server: Env::var("DB_SERVER"),
            user: Env::var("DB_USER"),
            password: Env::var("DB_PASSWORD"),
            name: Env::var("DB_NAME"),
            port: None,
            trust_cert: None,
        };
        Figment::from(Serialized::defaults(text))
            .merge(Env::prefixed("DB_").only(&["port", "trust_cert"]))
    }
}

/// Fixed settings, used where the environment must not be consulted.
#[derive(Debug, Clone, Default)]
pub struct StaticDbConfig(pub RawDbSettings);

impl DbConfigSource for StaticDbConfig {
    fn figment(&self) -> Figment {
        Figment::from(Serialized::defaults(self.0.clone()))
    }
}

impl DbConfig {
    /// Resolve and validate the settings. Called once per request so that
    /// rotated credentials are picked up without a restart.
    pub fn resolve(source: &dyn DbConfigSource) -> Result<Self, ConfigError> {
        let raw: RawDbSettings = source
            .figment()
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::from_raw(raw)
    }

    pub fn from_raw(raw: RawDbSettings) -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let server = required(raw.server, "DB_SERVER", &mut missing);
        let user = required(raw.user, "DB_USER", &mut missing);
        let password = required(raw.password, "DB_PASSWORD", &mut missing);
        let database = required(raw.name, "DB_NAME", &mut missing);

        if !missing.is_empty() {
            return Err(ConfigError::Incomplete { missing });
        }

        Ok(Self {
            server,
            user,
            password,
            database,
            port: raw.port.unwrap_or(DEFAULT_MSSQL_PORT),
            trust_cert: raw.trust_cert.unwrap_or(false),
        })
    }
}

fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RawDbSettings {
        RawDbSettings {
            server: Some("db.example.net".into()),
            user: Some("portal".into()),
            password: Some("s3cret".into()),
            name: Some("research".into()),
            port: None,
            trust_cert: None,
        }
    }

    #[test]
    fn resolves_complete_settings_with_default_port() {
        let cfg = DbConfig::resolve(&StaticDbConfig(complete())).unwrap();
        assert_eq!(cfg.server, "db.example.net");
        assert_eq!(cfg.database, "research");
        assert_eq!(cfg.port, DEFAULT_MSSQL_PORT);
    }

    #[test]
    fn reports_every_missing_or_blank_field() {
        let mut raw = complete();
        raw.user = None;
        raw.name = Some("   ".into());
        let err = DbConfig::resolve(&StaticDbConfig(raw)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Incomplete {
                missing: vec!["DB_USER", "DB_NAME"]
            }
        );
        assert!(err.to_string().starts_with("Database configuration is incomplete"));
    }

    #[test]
    fn empty_source_is_incomplete() {
        let err = DbConfig::resolve(&StaticDbConfig::default()).unwrap_err();
        match err {
            ConfigError::Incomplete { missing } => assert_eq!(missing.len(), 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn debug_output_hides_password() {
        let cfg = DbConfig::from_raw(complete()).unwrap();
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn env_settings_keep_numeric_and_boolean_text_verbatim() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DB_SERVER", "10.0.0.5");
            jail.set_env("DB_USER", "1234");
            jail.set_env("DB_PASSWORD", "007");
            jail.set_env("DB_NAME", "2024");

            let cfg = DbConfig::resolve(&EnvDbConfig).map_err(|e| e.to_string())?;
            assert_eq!(cfg.server, "10.0.0.5");
            assert_eq!(cfg.user, "1234");
            assert_eq!(cfg.password, "007");
            assert_eq!(cfg.database, "2024");
            assert_eq!(cfg.port, DEFAULT_MSSQL_PORT);
            assert!(!cfg.trust_cert);

            jail.set_env("DB_PASSWORD", "true");
            let cfg = DbConfig::resolve(&EnvDbConfig).map_err(|e| e.to_string())?;
            assert_eq!(cfg.password, "true");
            Ok(())
        });
    }

    #[test]
    fn env_port_and_trust_cert_are_typed() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DB_SERVER", "sql.local");
            jail.set_env("DB_USER", "sa");
            jail.set_env("DB_PASSWORD", "pw");
            jail.set_env("DB_NAME", "research");
            jail.set_env("DB_PORT", "14330");
            jail.set_env("DB_TRUST_CERT", "true");

            let cfg = DbConfig::resolve(&EnvDbConfig).map_err(|e| e.to_string())?;
            assert_eq!(cfg.port, 14330);
            assert!(cfg.trust_cert);

            jail.set_env("DB_PORT", "not-a-port");
            let err = DbConfig::resolve(&EnvDbConfig).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)));
            Ok(())
        });
    }

    #[test]
    fn env_blank_or_unset_settings_are_incomplete() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("DB_SERVER", "sql.local");
            jail.set_env("DB_USER", "");

            let err = DbConfig::resolve(&EnvDbConfig).unwrap_err();
            assert_eq!(
                err,
                ConfigError::Incomplete {
                    missing: vec!["DB_USER", "DB_PASSWORD", "DB_NAME"]
                }
            );
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_means_no_timeout() {
        let mut cfg = Config::default();
        cfg.query_timeout_secs = Some(0);
        assert!(cfg.query_timeout().is_none());
        cfg.query_timeout_secs = Some(5);
        assert_eq!(cfg.query_timeout(), Some(Duration::from_secs(5)));
    }
}
