pub mod limiter;

use crate::config::{self, CreationMode};
use anyhow::{ensure, Context};
use magna_migration::{Migrator, MigratorTrait};
use sea_orm::{
    ConnectOptions, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, ExecResult,
    QueryResult, RuntimeErr, Statement,
};
use sqlx::error::ErrorKind;
use std::{future::Future, ops::Deref, time::Duration};
use tracing::instrument;
use url::Url;

#[derive(Clone, Debug)]
pub struct Database {
    /// the database connection
    db: DatabaseConnection,
}

impl Database {
    #[instrument(err)]
    pub async fn new(database: &config::Database) -> Result<Self, anyhow::Error> {
        let url = database.to_url();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!("connect to {}", strip_password(url.clone()));
        }

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(database.max_conn);
        opt.min_connections(database.min_conn);
        opt.sqlx_logging_level(log::LevelFilter::Trace);

        opt.connect_timeout(Duration::from_secs(database.connect_timeout));
        opt.acquire_timeout(Duration::from_secs(database.acquire_timeout));

        let db = sea_orm::Database::connect(opt).await?;

        Ok(Self { db })
    }

    /// Connect and prepare the schema according to the creation mode.
    pub async fn with_external_config(
        database: &config::Database,
        mode: CreationMode,
    ) -> Result<Self, anyhow::Error> {
        match mode {
            CreationMode::Default => {
                let db = Self::new(database).await?;
                db.migrate().await?;
                Ok(db)
            }
            CreationMode::RefreshSchema => {
                let db = Self::new(database).await?;
                db.refresh().await?;
                Ok(db)
            }
            CreationMode::Bootstrap => Self::bootstrap(database).await,
        }
    }

    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), anyhow::Error> {
        log::debug!("applying migrations");
        Migrator::up(&self.db, None).await?;
        log::debug!("applied migrations");

        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn refresh(&self) -> Result<(), anyhow::Error> {
        log::warn!("refreshing database schema...");
        Migrator::refresh(&self.db).await?;
        log::warn!("refreshing database schema... done!");

        Ok(())
    }

    /// Drop and re-create the database, then apply all migrations.
    ///
    /// For SQLite there is no server to ask, the schema gets refreshed instead.
    #[instrument(err)]
    pub async fn bootstrap(database: &config::Database) -> Result<Self, anyhow::Error> {
        if database.is_sqlite() {
            let db = Self::new(database).await?;
            db.refresh().await?;
            return Ok(db);
        }

        ensure!(
            database.url.is_none(),
            "Unable to bootstrap database with '--db-url'"
        );

        let url = config::Database {
            name: "postgres".into(),
            ..database.clone()
        }
        .to_url();

        log::debug!("bootstrap to {}", strip_password(url.clone()));
        let db = sea_orm::Database::connect(url).await?;

        db.execute(Statement::from_string(
            db.get_database_backend(),
            format!("DROP DATABASE IF EXISTS \"{}\";", database.name),
        ))
        .await?;

        db.execute(Statement::from_string(
            db.get_database_backend(),
            format!("CREATE DATABASE \"{}\";", database.name),
        ))
        .await?;
        db.close().await?;

        let db = Self::new(database).await?;
        db.migrate().await?;

        Ok(db)
    }

    #[instrument(skip(self), err)]
    pub async fn close(self) -> anyhow::Result<()> {
        Ok(self.db.close().await?)
    }

    /// Ping the database.
    ///
    /// Intended to be used for health checks.
    #[instrument(skip(self), err)]
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.db
            .ping()
            .await
            .context("failed to ping the database")?;
        Ok(())
    }
}

impl Deref for Database {
    type Target = DatabaseConnection;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Implementation of the connection trait for our database struct.
///
/// Transactions are started through [`Deref`] on the inner connection.
#[async_trait::async_trait]
impl ConnectionTrait for Database {
    fn get_database_backend(&self) -> DbBackend {
        self.db.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        self.db.execute(stmt).await
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        self.db.execute_unprepared(sql).await
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        self.db.query_one(stmt).await
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        self.db.query_all(stmt).await
    }

    fn support_returning(&self) -> bool {
        self.db.support_returning()
    }
}

/// A trait to help working with database errors
pub trait DatabaseErrors {
    /// return `true` if the error is a duplicate key error
    fn is_duplicate(&self) -> bool;

    /// return `true` if the error was caused by a competing writer holding the lock
    fn is_busy(&self) -> bool;
}

/// Primary result codes of SQLite, the extended codes carry them in the lowest byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn database_error(err: &DbErr) -> Option<&dyn sqlx::error::DatabaseError> {
    match err {
        DbErr::Conn(RuntimeErr::SqlxError(sqlx::error::Error::Database(err)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::error::Error::Database(err)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::error::Error::Database(err))) => {
            Some(&**err)
        }
        _ => None,
    }
}

impl DatabaseErrors for DbErr {
    fn is_duplicate(&self) -> bool {
        database_error(self).is_some_and(|err| err.kind() == ErrorKind::UniqueViolation)
    }

    fn is_busy(&self) -> bool {
        database_error(self)
            .and_then(|err| err.code())
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
    }
}

/// Run an operation again when it lost against a concurrent writer.
///
/// A failed attempt must have rolled back its transaction. The next attempt sees what the
/// winner committed, so it finds the row instead of creating it. Gives up after `attempts`.
pub async fn retry_contended<T, E, F, Fut>(attempts: u32, mut f: F) -> Result<T, E>
where
    E: DatabaseErrors + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Err(err) if attempt < attempts && (err.is_busy() || err.is_duplicate()) => {
                log::debug!("Contended write (attempt {attempt}/{attempts}): {err}");
                tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Remove the password from the URL and replace it with `***`, if present.
///
/// If this is not a URL, or does not contain a password, this is a no-op.
fn strip_password(url: String) -> String {
    match Url::parse(&url) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => url,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sea_orm::TransactionTrait;

    /// ensure that the password is not present, but not necessarily removing the string itself
    #[test]
    fn url_strip_password() {
        assert_eq!(
            "postgres://magna:***@db:5432/magna?sslmode=allow&other=magna1234",
            strip_password("postgres://magna:magna1234@db:5432/magna?sslmode=allow&other=magna1234".to_string())
        )
    }

    /// if there's no password, this shouldn't change anything
    #[test]
    fn url_strip_no_password() {
        assert_eq!(
            "postgres://magna@db:5432/magna",
            strip_password("postgres://magna@db:5432/magna".to_string())
        )
    }

    /// if this is not a URL, then it should not panic
    #[test]
    fn url_strip_password_not_a_url() {
        assert_eq!("foo-bar-baz", strip_password("foo-bar-baz".to_string()))
    }

    #[test]
    fn not_a_duplicate() {
        let err = DbErr::RecordNotFound("nope".into());
        assert!(!err.is_duplicate());
        assert!(!err.is_busy());
    }

    #[test_log::test(tokio::test)]
    async fn retry_until_uncontended() -> anyhow::Result<()> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);
        let db = sea_orm::Database::connect(opt).await?;
        db.execute_unprepared("CREATE TABLE t (k TEXT PRIMARY KEY)")
            .await?;

        let mut calls = 0;
        let result = retry_contended(3, || {
            calls += 1;
            let db = &db;
            async move { db.execute_unprepared("INSERT INTO t (k) VALUES ('a')").await }
        })
        .await;

        // the first insert succeeds, nothing to retry
        assert!(result.is_ok());
        assert_eq!(calls, 1);

        let mut calls = 0;
        let result = retry_contended(3, || {
            calls += 1;
            let db = &db;
            async move { db.execute_unprepared("INSERT INTO t (k) VALUES ('a')").await }
        })
        .await;

        // a duplicate keeps failing, until the attempts are used up
        assert!(result.is_err_and(|err| err.is_duplicate()));
        assert_eq!(calls, 3);

        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn sqlite_lock_is_busy() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("busy.db").display());

        let first = sea_orm::Database::connect(url.as_str()).await?;
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(1).min_connections(1);
        let second = sea_orm::Database::connect(opt).await?;

        first
            .execute_unprepared("CREATE TABLE t (k TEXT PRIMARY KEY)")
            .await?;
        second.execute_unprepared("PRAGMA busy_timeout = 0").await?;

        let tx = first.begin().await?;
        tx.execute_unprepared("INSERT INTO t (k) VALUES ('a')")
            .await?;

        let err = second
            .execute_unprepared("INSERT INTO t (k) VALUES ('b')")
            .await
            .expect_err("must wait for the lock");
        assert!(err.is_busy(), "unexpected error: {err:?}");
        assert!(!err.is_duplicate());

        tx.rollback().await?;
        Ok(())
    }

    #[test_log::test(tokio::test)]
    async fn sqlite_unique_violation_is_duplicate() -> anyhow::Result<()> {
        // a single connection, every in-memory connection has its own database
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);
        let db = sea_orm::Database::connect(opt).await?;
        db.execute_unprepared("CREATE TABLE t (k TEXT PRIMARY KEY)")
            .await?;
        db.execute_unprepared("INSERT INTO t (k) VALUES ('a')")
            .await?;

        let err = db
            .execute_unprepared("INSERT INTO t (k) VALUES ('a')")
            .await
            .expect_err("must violate the primary key");
        assert!(err.is_duplicate(), "unexpected error: {err:?}");

        Ok(())
    }
}
