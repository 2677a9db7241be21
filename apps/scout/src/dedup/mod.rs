//! Dedup Store: durable memory of every posting URL ever discovered or applied to.
//!
//! Fetchers consult it inline: a URL is recorded the moment it is discovered,
//! before the posting reaches any downstream stage. Duplicate inserts are
//! absorbed by the `UNIQUE` constraint and reported as "not newly recorded".

pub mod applications;
pub mod search_terms;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::errors::StoreError;
use crate::models::store::SeenRecord;

/// The seen-check seam shared by every fetcher.
///
/// Carried as `Arc<dyn DedupStore>` so fetchers running in parallel share one store.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// True when the URL was discovered before OR has an application record.
    async fn has_seen(&self, url: &str) -> Result<bool, StoreError>;

    /// Records the URL as discovered. Returns `true` only for the call that
    /// actually inserted it; repeats are no-ops returning `false`.
    async fn mark_seen(&self, url: &str) -> Result<bool, StoreError>;

    async fn is_applied(&self, url: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed store. Also owns the application history and search terms.
#[derive(Clone)]
pub struct SqlDedupStore {
    pool: SqlitePool,
}

impl SqlDedupStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the dedup record for a URL, if one exists.
    pub async fn seen_record(&self, url: &str) -> Result<Option<SeenRecord>, StoreError> {
        let record = sqlx::query_as::<_, SeenRecord>(
            "SELECT job_url, first_seen_at FROM discovered_jobs WHERE job_url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

#[async_trait]
impl DedupStore for SqlDedupStore {
    async fn has_seen(&self, url: &str) -> Result<bool, StoreError> {
        let seen: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM discovered_jobs WHERE job_url = ?)
                OR EXISTS(SELECT 1 FROM applications WHERE job_url = ?)
            "#,
        )
        .bind(url)
        .bind(url)
        .fetch_one(&self.pool)
        .await?;
        Ok(seen != 0)
    }

    async fn mark_seen(&self, url: &str) -> Result<bool, StoreError> {
        if url.trim().is_empty() {
            return Err(StoreError::Validation(
                "cannot record a posting without a URL".to_string(),
            ));
        }

        let result = sqlx::query(
            "INSERT OR IGNORE INTO discovered_jobs (job_url, first_seen_at) VALUES (?, ?)",
        )
        .bind(url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            debug!("URL already recorded: {url}");
        }
        Ok(inserted)
    }

    async fn is_applied(&self, url: &str) -> Result<bool, StoreError> {
        let applied: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM applications WHERE job_url = ?)")
                .bind(url)
                .fetch_one(&self.pool)
                .await?;
        Ok(applied != 0)
    }
}
