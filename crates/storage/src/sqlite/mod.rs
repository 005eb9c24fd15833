use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod completion_repo;
mod deck_repo;
mod mapping;
mod migrate;
mod performance_repo;
mod progress_repo;

pub use migrate::{LATEST_SCHEMA_VERSION, MigrationReport};

/// `SQLite` backend for every study repository.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteOpenError {
    #[error("invalid sqlite url `{url}`")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("cannot open sqlite database")]
    Connect(#[source] sqlx::Error),

    #[error("cannot read schema version")]
    SchemaVersion(#[source] sqlx::Error),

    #[error("schema migration v{version} failed")]
    Migration {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
}

impl SqliteRepository {
    /// Opens the database and brings its schema up to date.
    ///
    /// Connections enforce foreign keys and use WAL journaling with a
    /// five second busy timeout.
    ///
    /// # Errors
    ///
    /// Returns `SqliteOpenError` if the URL does not parse, the pool cannot
    /// connect, or a migration fails. A failed migration names its version.
    pub async fn open(database_url: &str) -> Result<(Self, MigrationReport), SqliteOpenError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|source| SqliteOpenError::InvalidUrl {
                url: database_url.to_owned(),
                source,
            })?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await
            .map_err(SqliteOpenError::Connect)?;

        let repo = Self { pool };
        let report = repo.migrate().await?;
        Ok((repo, report))
    }

    /// Applies any schema versions the database has not seen yet.
    ///
    /// # Errors
    ///
    /// Returns `SqliteOpenError::Migration` for the first version that fails.
    pub async fn migrate(&self) -> Result<MigrationReport, SqliteOpenError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// `Storage` over a freshly opened `SQLite` database.
    ///
    /// # Errors
    ///
    /// See [`SqliteRepository::open`].
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteOpenError> {
        let (repo, _) = SqliteRepository::open(database_url).await?;
        Ok(Self::from_repository(repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_reports_applied_versions_once() {
        let url = "sqlite:file:memdb_open_report?mode=memory&cache=shared";
        let (repo, first) = SqliteRepository::open(url).await.unwrap();
        assert_eq!(first.applied, vec![LATEST_SCHEMA_VERSION]);
        assert_eq!(first.schema_version, LATEST_SCHEMA_VERSION);
        assert!(!first.is_up_to_date_on_open());

        let again = repo.migrate().await.unwrap();
        assert!(again.applied.is_empty());
        assert_eq!(again.schema_version, LATEST_SCHEMA_VERSION);
        assert!(again.is_up_to_date_on_open());
    }

    #[tokio::test]
    async fn open_rejects_unparsable_url() {
        let err = SqliteRepository::open("sqlite:study.db?flavor=plain").await.err().unwrap();
        assert!(matches!(err, SqliteOpenError::InvalidUrl { .. }));
    }
}
