use std::{future::Future, time::Duration};

use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use utils::assets::asset_dir;

pub mod entities;
pub mod models;
pub mod retry;
pub mod scope;
pub mod types;

pub use retry::{RetryPolicy, TransientError};
pub use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
pub use scope::Scope;

pub type DbPool = DatabaseConnection;

const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Pooled connection plus the retry policy every request-level unit of work runs under.
#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
    retry: RetryPolicy,
}

impl DBService {
    pub async fn new(database_url: &str, retry: RetryPolicy) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .acquire_timeout(Duration::from_secs(30))
            .sqlx_logging(false);
        Self::connect(options, retry).await
    }

    /// Fresh in-memory SQLite database with migrations applied.
    pub async fn new_in_memory() -> Result<DBService, DbErr> {
        // Every pooled connection would otherwise open its own empty database.
        let mut options = ConnectOptions::new("sqlite::memory:");
        options
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        Self::connect(options, RetryPolicy::default()).await
    }

    async fn connect(options: ConnectOptions, retry: RetryPolicy) -> Result<DBService, DbErr> {
        let pool = Database::connect(options).await?;
        db_migration::Migrator::up(&pool, None).await?;
        tracing::debug!(retry = ?retry, "Database ready");
        Ok(DBService { pool, retry })
    }

    /// `DATABASE_URL` when set, otherwise `configured`, otherwise a SQLite file in the
    /// asset directory.
    pub fn resolve_database_url(configured: Option<&str>) -> String {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                return url.to_string();
            }
        }
        match configured.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => url.to_string(),
            None => format!(
                "sqlite://{}?mode=rwc",
                asset_dir().join("db.sqlite").to_string_lossy()
            ),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Runs one unit of work against the pool, retrying it as a whole on transient
    /// connection failures.
    pub async fn with_retry<'a, T, E, F, Fut>(&'a self, mut op: F) -> Result<T, E>
    where
        E: TransientError + std::fmt::Display,
        F: FnMut(&'a DbPool) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        retry::retry_transient(&self.retry, || op(&self.pool)).await
    }
}
