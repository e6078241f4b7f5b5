//! Wide-column store backend.
//!
//! Talks to a PostgreSQL-compatible cluster. The keyspace maps to a schema
//! holding one `(id UUID PRIMARY KEY, value VARCHAR)` table. Inserts are
//! add-if-absent (`ON CONFLICT DO NOTHING`); zero affected rows means the key
//! was already present.
//!
//! The harness is synchronous, so each connection owns a current-thread tokio
//! runtime and blocks on every call.

use std::future::Future;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection as _;
use tokio::runtime::Runtime;

use super::{
    validate_identifier, Backend, Connection, SchemaSpec, DEFAULT_NAMESPACE, DEFAULT_TABLE,
};
use crate::error::{Error, Result};
use crate::fixtures::UserRecord;

/// Default host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port.
pub const DEFAULT_PORT: u16 = 5432;

/// Default database.
pub const DEFAULT_DATABASE: &str = "postgres";

/// Default user.
pub const DEFAULT_USER: &str = "postgres";

/// Default wire protocol version.
pub const DEFAULT_PROTOCOL_VERSION: &str = "3.0";

/// Protocol major version spoken by the driver.
const SUPPORTED_PROTOCOL_MAJOR: u32 = 3;

/// Wide-column store configuration.
#[derive(Debug, Clone)]
pub struct WideColumnConfig {
    /// Contact points, tried in order.
    pub hosts: Vec<String>,

    pub port: u16,

    /// Keyspace (schema) holding the benchmark table.
    pub keyspace: String,

    /// Requested wire protocol version, e.g. "3.0".
    pub protocol_version: String,

    pub database: String,

    pub user: String,

    pub password: Option<String>,

    /// Per-operation timeout. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl WideColumnConfig {
    /// Create a configuration with the given contact points.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            port: DEFAULT_PORT,
            keyspace: DEFAULT_NAMESPACE.to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            user: DEFAULT_USER.to_string(),
            password: None,
            timeout: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = user.into();
        self.password = password;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Hosts joined with commas, as shown in logs.
    pub fn hosts_display(&self) -> String {
        self.hosts.join(",")
    }

    fn connect_options(&self, host: &str) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database);
        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

impl Default for WideColumnConfig {
    fn default() -> Self {
        Self::new([DEFAULT_HOST])
    }
}

/// Check that the requested protocol version is one the driver speaks.
fn check_protocol_version(version: &str) -> Result<()> {
    let major = version
        .split('.')
        .next()
        .and_then(|m| m.trim().parse::<u32>().ok())
        .ok_or_else(|| Error::Config(format!("invalid protocol version {:?}", version)))?;
    if major != SUPPORTED_PROTOCOL_MAJOR {
        return Err(Error::Config(format!(
            "unsupported protocol version {}: only {}.x is available",
            version, SUPPORTED_PROTOCOL_MAJOR
        )));
    }
    Ok(())
}

/// Statements for one provisioned table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statements {
    drop_keyspace: String,
    create_keyspace: String,
    create_table: String,
    insert: String,
    select: String,
}

impl Statements {
    fn for_schema(schema: &SchemaSpec) -> Result<Self> {
        validate_identifier("keyspace", &schema.namespace)?;
        validate_identifier("table", &schema.table)?;
        let ks = &schema.namespace;
        let table = format!("{}.{}", ks, schema.table);
        Ok(Self {
            drop_keyspace: format!("DROP SCHEMA IF EXISTS {ks} CASCADE"),
            create_keyspace: format!("CREATE SCHEMA {ks}"),
            create_table: format!(
                "CREATE TABLE {table} (id UUID PRIMARY KEY, value VARCHAR NOT NULL)"
            ),
            insert: format!(
                "INSERT INTO {table} (id, value) VALUES ($1::uuid, $2) ON CONFLICT (id) DO NOTHING"
            ),
            select: format!("SELECT value FROM {table} WHERE id = $1::uuid"),
        })
    }
}

/// Block on `fut`, bounded by `timeout` when set.
fn block_on<T, F>(rt: &Runtime, timeout: Option<Duration>, fut: F) -> Result<sqlx::Result<T>>
where
    F: Future<Output = sqlx::Result<T>>,
{
    match timeout {
        Some(limit) => rt
            .block_on(async { tokio::time::timeout(limit, fut).await })
            .map_err(|_| Error::Timeout(limit)),
        None => Ok(rt.block_on(fut)),
    }
}

/// Whether a session can still carry calls.
///
/// A call cut short by a timeout leaves the session mid-protocol, so every
/// later call on it fails instead of reading a stale response.
#[derive(Debug, Default)]
struct SessionHealth {
    broken: bool,
}

impl SessionHealth {
    fn check(&self) -> Result<()> {
        if self.broken {
            return Err(Error::Connection(
                "session abandoned after a timed-out call".to_string(),
            ));
        }
        Ok(())
    }

    fn track<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if let Err(Error::Timeout(limit)) = &outcome {
            tracing::warn!(timeout = ?limit, "wide-column call timed out, abandoning session");
            self.broken = true;
        }
        outcome
    }
}

/// Wide-column store backend.
pub struct WideColumnStore {
    config: WideColumnConfig,
}

impl WideColumnStore {
    pub fn new(config: WideColumnConfig) -> Self {
        Self { config }
    }
}

impl Backend for WideColumnStore {
    type Conn = WideColumnConnection;

    fn name(&self) -> &str {
        "WideColumn"
    }

    fn schema(&self) -> SchemaSpec {
        SchemaSpec::new(&self.config.keyspace).with_table(DEFAULT_TABLE)
    }

    fn connect(&self) -> Result<WideColumnConnection> {
        check_protocol_version(&self.config.protocol_version)?;
        if self.config.hosts.is_empty() {
            return Err(Error::Config("no wide-column hosts configured".to_string()));
        }
        let statements = Statements::for_schema(&self.schema())?;

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let mut last_error = String::new();
        for host in &self.config.hosts {
            let options = self.config.connect_options(host);
            match block_on(
                &rt,
                self.config.timeout,
                PgConnection::connect_with(&options),
            ) {
                Ok(Ok(conn)) => {
                    tracing::info!(host = %host, port = self.config.port, "connected to wide-column store");
                    return Ok(WideColumnConnection {
                        conn,
                        rt,
                        statements,
                        timeout: self.config.timeout,
                        health: SessionHealth::default(),
                    });
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(e) => last_error = e.to_string(),
            }
            tracing::warn!(host = %host, error = %last_error, "wide-column host unavailable");
        }

        Err(Error::Connection(format!(
            "no reachable host in [{}]: {}",
            self.config.hosts_display(),
            last_error
        )))
    }
}

/// Open wide-column store session.
pub struct WideColumnConnection {
    // Declared before `rt` so the socket drops while the runtime is alive.
    conn: PgConnection,
    rt: Runtime,
    statements: Statements,
    timeout: Option<Duration>,
    health: SessionHealth,
}

impl WideColumnConnection {
    fn execute_ddl(&mut self, sql: &str) -> Result<()> {
        self.health.check()?;
        let outcome = block_on(
            &self.rt,
            self.timeout,
            sqlx::query(sql).execute(&mut self.conn),
        );
        self.health
            .track(outcome)?
            .map_err(|e| Error::Provision(e.to_string()))?;
        Ok(())
    }
}

impl Connection for WideColumnConnection {
    fn provision(&mut self, schema: &SchemaSpec) -> Result<()> {
        let statements =
            Statements::for_schema(schema).map_err(|e| Error::Provision(e.to_string()))?;
        for sql in [
            &statements.drop_keyspace,
            &statements.create_keyspace,
            &statements.create_table,
        ] {
            self.execute_ddl(sql)?;
        }
        tracing::info!(keyspace = %schema.namespace, table = %schema.table, "keyspace recreated");
        self.statements = statements;
        Ok(())
    }

    fn put(&mut self, key: &str, record: &UserRecord) -> Result<()> {
        self.health.check()?;
        let value = record.to_json()?;
        let outcome = block_on(
            &self.rt,
            self.timeout,
            sqlx::query(&self.statements.insert)
                .bind(key)
                .bind(value)
                .execute(&mut self.conn),
        );
        let done = self
            .health
            .track(outcome)?
            .map_err(|e| Error::write(key, e))?;
        if done.rows_affected() == 0 {
            return Err(Error::DuplicateKey(key.to_string()));
        }
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<UserRecord> {
        self.health.check()?;
        let outcome = block_on(
            &self.rt,
            self.timeout,
            sqlx::query_scalar(&self.statements.select)
                .bind(key)
                .fetch_optional(&mut self.conn),
        );
        let value: Option<String> = self
            .health
            .track(outcome)?
            .map_err(|e| Error::read(key, e))?;
        let value = value.ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(UserRecord::from_json(value.as_bytes())?)
    }

    fn close(self) -> Result<()> {
        let WideColumnConnection {
            rt,
            conn,
            timeout,
            health,
            ..
        } = self;
        // A session left mid-protocol cannot say goodbye; dropping it closes the socket.
        if health.broken {
            drop(conn);
            return Ok(());
        }
        block_on(&rt, timeout, conn.close())?.map_err(|e| Error::Connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version() {
        assert!(check_protocol_version("3.0").is_ok());
        assert!(check_protocol_version("3").is_ok());
        assert!(check_protocol_version("3.2.0").is_ok());
        assert!(matches!(check_protocol_version("4.0"), Err(Error::Config(_))));
        assert!(matches!(check_protocol_version("abc"), Err(Error::Config(_))));
        assert!(matches!(check_protocol_version(""), Err(Error::Config(_))));
    }

    #[test]
    fn test_statements() {
        let statements = Statements::for_schema(&SchemaSpec::new("benchtest")).unwrap();
        assert_eq!(statements.drop_keyspace, "DROP SCHEMA IF EXISTS benchtest CASCADE");
        assert_eq!(statements.create_keyspace, "CREATE SCHEMA benchtest");
        assert!(statements
            .create_table
            .starts_with("CREATE TABLE benchtest.kvbench (id UUID PRIMARY KEY"));
        assert!(statements.insert.contains("ON CONFLICT (id) DO NOTHING"));
        assert_eq!(
            statements.select,
            "SELECT value FROM benchtest.kvbench WHERE id = $1::uuid"
        );
    }

    #[test]
    fn test_statements_reject_injection() {
        assert!(Statements::for_schema(&SchemaSpec::new("ks; DROP TABLE x")).is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = WideColumnConfig::new(["10.0.0.1", "10.0.0.2"])
            .with_port(9042)
            .with_keyspace("ks")
            .with_protocol_version("3.2.0")
            .with_credentials("bench", Some("secret".to_string()))
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.hosts_display(), "10.0.0.1,10.0.0.2");
        assert_eq!(config.port, 9042);
        assert_eq!(config.keyspace, "ks");
        assert_eq!(config.user, "bench");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_connect_rejects_bad_config() {
        let store = WideColumnStore::new(WideColumnConfig::default().with_protocol_version("2.0"));
        assert!(matches!(store.connect(), Err(Error::Config(_))));

        let store = WideColumnStore::new(WideColumnConfig::new(Vec::<String>::new()));
        assert!(matches!(store.connect(), Err(Error::Config(_))));
    }

    #[test]
    fn test_timeout_abandons_session() {
        let mut health = SessionHealth::default();
        assert!(health.check().is_ok());

        let ok: Result<u32> = health.track(Ok(1));
        assert_eq!(ok.unwrap(), 1);
        assert!(health.check().is_ok());

        let failed: Result<u32> = health.track(Err(Error::read("k", "boom")));
        assert!(failed.is_err());
        assert!(health.check().is_ok());

        let timed_out: Result<u32> =
            health.track(Err(Error::Timeout(Duration::from_millis(5))));
        assert!(matches!(timed_out, Err(Error::Timeout(_))));
        assert!(matches!(health.check(), Err(Error::Connection(_))));
        assert!(matches!(health.check(), Err(Error::Connection(_))));
    }

    #[test]
    fn test_block_on_timeout() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let outcome: Result<sqlx::Result<()>> = block_on(
            &rt,
            Some(Duration::from_millis(10)),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        );
        assert!(matches!(outcome, Err(Error::Timeout(_))));
    }

    #[test]
    fn test_connect_unreachable_host() {
        // Port 1 is never a database listener.
        let store = WideColumnStore::new(
            WideColumnConfig::new(["127.0.0.1"])
                .with_port(1)
                .with_timeout(Duration::from_secs(2)),
        );
        assert!(matches!(
            store.connect(),
            Err(Error::Connection(_)) | Err(Error::Timeout(_))
        ));
    }
}
