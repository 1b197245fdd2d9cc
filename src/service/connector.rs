use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

pub const PARAM_DELIMITER: char = ';';
pub const USER_PARAM: &str = "avatica_user";
pub const PASSWORD_PARAM: &str = "avatica_password";

/// Driver seam between the lifecycle manager and the database.
pub trait Connector: Send + Sync + 'static {
    type Connection: Send + 'static;

    fn establish(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Self::Connection, sqlx::Error>> + Send;

    /// Run a trivial query proving the connection is usable.
    fn validate(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn close(&self, conn: Self::Connection) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

/// `<base>;avatica_user=<username>;avatica_password=<password>`
pub fn authenticated_url(base: &str, username: &str, password: &str) -> String {
    format!(
        "{base}{PARAM_DELIMITER}{USER_PARAM}={username}{PARAM_DELIMITER}{PASSWORD_PARAM}={password}"
    )
}

/// A connection string split into its base and `;key=value` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUrl<'a> {
    pub base: &'a str,
    pub params: Vec<(&'a str, &'a str)>,
}

impl<'a> ConnectionUrl<'a> {
    pub fn parse(url: &'a str) -> Self {
        let mut parts = url.split(PARAM_DELIMITER);
        let base = parts.next().unwrap_or_default();
        let params = parts
            .filter(|p| !p.is_empty())
            .map(|p| p.split_once('=').unwrap_or((p, "")))
            .collect();
        Self { base, params }
    }

    pub fn param(&self, key: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

/// Mask the password parameter so the string can be logged.
pub fn redact(url: &str) -> String {
    let parsed = ConnectionUrl::parse(url);
    let mut out = parsed.base.to_string();
    for (key, value) in parsed.params {
        out.push(PARAM_DELIMITER);
        out.push_str(key);
        out.push('=');
        if key == PASSWORD_PARAM {
            out.push_str("****");
        } else {
            out.push_str(value);
        }
    }
    out
}

/// Opens single SQLite connections through sqlx.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    connect_timeout: Duration,
}

impl Default for SqliteConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl SqliteConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    fn options(url: &str) -> Result<SqliteConnectOptions, sqlx::Error> {
        let parsed = ConnectionUrl::parse(url);
        for (key, _) in &parsed.params {
            match *key {
                // SQLite has no user authentication.
                USER_PARAM | PASSWORD_PARAM => {}
                other => warn!(param = other, "ignoring unknown connection parameter"),
            }
        }
        if let Some(user) = parsed.param(USER_PARAM) {
            debug!(user, "credentials carried in connection string are not used by sqlite");
        }
        Ok(SqliteConnectOptions::from_str(parsed.base)?.create_if_missing(true))
    }
}

impl Connector for SqliteConnector {
    type Connection = SqliteConnection;

    async fn establish(&self, url: &str) -> Result<SqliteConnection, sqlx::Error> {
        debug!(url = %redact(url), "Connecting");
        let opts = Self::options(url)?;
        match tokio::time::timeout(self.connect_timeout, opts.connect()).await {
            Ok(conn) => conn,
            Err(_) => Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", self.connect_timeout),
            ))),
        }
    }

    async fn validate(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        let one: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&mut *conn).await?;
        debug!(result = one.0, "validation query ok");
        Ok(())
    }

    async fn close(&self, conn: SqliteConnection) -> Result<(), sqlx::Error> {
        conn.close().await
    }
}
