//! Database primitives shared by the server and the stores: connection
//! settings, pool setup, bounded retries of transient connectivity failures
//! and a small backend-aware SQL parameter builder.

use std::{future::Future, time::Duration};

use sea_orm::{
    ConnectOptions, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement, Value,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (set {0})")]
    MissingUrl(String),
    #[error("invalid value for {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("database connection failed after {attempts} attempt(s): {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: DbErr,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// How often transient failures are retried and how long to wait between tries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_ms: 200,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting. Used by tests against in-memory databases.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff_ms: 0,
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub retry: RetryPolicy,
}

const URL_KEY: &str = "DATABASE_URL";

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var(URL_KEY).map_err(|_| DbError::MissingUrl(URL_KEY.into()))?;
        let mut settings = Self::new(url);
        if let Some(value) = env_parse::<u32>("DATABASE_MAX_CONNECTIONS")? {
            settings.max_connections = value.max(1);
        }
        if let Some(value) = env_parse::<u32>("DATABASE_CONNECT_RETRIES")? {
            settings.retry.attempts = value.max(1);
        }
        if let Some(value) = env_parse::<u64>("DATABASE_RETRY_BACKOFF_MS")? {
            settings.retry.backoff_ms = value;
        }
        Ok(settings)
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> DbResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DbError::InvalidSetting { key, value: raw }),
        Err(_) => Ok(None),
    }
}

/// Open the pool, retrying connectivity failures per the settings.
pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let mut options = ConnectOptions::new(settings.url.clone());
    options
        .max_connections(settings.max_connections)
        .sqlx_logging(false);
    let attempts = settings.retry.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match Database::connect(options.clone()).await {
            Ok(pool) => {
                info!(attempt, "database pool ready");
                return Ok(pool);
            }
            Err(err) if attempt < attempts && is_transient(&err) => {
                warn!(attempt, error = %err, "database connect failed; retrying");
                tokio::time::sleep(settings.retry.delay(attempt)).await;
            }
            Err(source) => return Err(DbError::Connect { attempts: attempt, source }),
        }
    }
}

/// Connectivity failures worth another try. Query and constraint errors are not.
pub fn is_transient(err: &DbErr) -> bool {
    matches!(err, DbErr::ConnectionAcquire(_) | DbErr::Conn(_))
}

/// Run `op`, retrying only transient connectivity errors, at most
/// `policy.attempts` times in total.
pub async fn retry_transient<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(err) if attempt < attempts && is_transient(&err) => {
                warn!(attempt, error = %err, "transient database error; retrying");
                tokio::time::sleep(policy.delay(attempt)).await;
            }
            other => return other,
        }
    }
}

/// Collects bind values for a raw statement and renders the placeholder
/// syntax the backend expects (`$n` for Postgres, `?` elsewhere).
#[derive(Debug)]
pub struct SqlParams {
    backend: DatabaseBackend,
    values: Vec<Value>,
}

impl SqlParams {
    pub fn new(backend: DatabaseBackend) -> Self {
        Self {
            backend,
            values: Vec::new(),
        }
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    /// Bind one value and return its placeholder.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        match self.backend {
            DatabaseBackend::Postgres => format!("${}", self.values.len()),
            _ => "?".to_string(),
        }
    }

    /// Bind every value and return a comma separated placeholder list for
    /// an `IN (...)` clause. Callers must not pass an empty iterator.
    pub fn bind_list<V, I>(&mut self, values: I) -> String
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        values
            .into_iter()
            .map(|value| self.bind(value))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn into_statement(self, sql: impl Into<String>) -> Statement {
        Statement::from_sql_and_values(self.backend, sql, self.values)
    }
}
