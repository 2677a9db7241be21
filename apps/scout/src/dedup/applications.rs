//! Application history. An applied URL counts as seen forever, whatever its
//! later status, so it never resurfaces as a new discovery.

use chrono::Utc;
use tracing::{info, warn};

use super::SqlDedupStore;
use crate::errors::StoreError;
use crate::models::store::ApplicationRecord;

/// Input for recording a submitted application.
pub struct NewApplication<'a> {
    pub job_url: &'a str,
    pub company: &'a str,
    pub title: &'a str,
    pub source: &'a str,
    pub match_score: Option<u32>,
    pub notes: Option<&'a str>,
}

impl SqlDedupStore {
    /// Records an application with status `submitted`.
    /// Returns `None` when an application for the URL already exists.
    pub async fn record_application(
        &self,
        app: NewApplication<'_>,
    ) -> Result<Option<i64>, StoreError> {
        if app.job_url.trim().is_empty() {
            return Err(StoreError::Validation(
                "cannot record an application without a URL".to_string(),
            ));
        }

        let now = Utc::now();
        let mut tx = self.pool().begin().await?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO applications
                (job_url, company, title, source, match_score, status, applied_at, notes)
            VALUES (?, ?, ?, ?, ?, 'submitted', ?, ?)
            "#,
        )
        .bind(app.job_url)
        .bind(app.company)
        .bind(app.title)
        .bind(app.source)
        .bind(app.match_score.map(i64::from))
        .bind(now)
        .bind(app.notes)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            warn!("Application already exists: {}", app.job_url);
            return Ok(None);
        }

        let id = result.last_insert_rowid();
        sqlx::query(
            "INSERT INTO status_history (application_id, status, updated_at) VALUES (?, 'submitted', ?)",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Recorded application: {} - {} (ID: {id})", app.company, app.title);
        Ok(Some(id))
    }

    /// Moves an application to a new status and appends a history row.
    /// Returns `false` when no application exists for the URL.
    pub async fn update_status(
        &self,
        job_url: &str,
        status: &str,
        notes: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool().begin().await?;

        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM applications WHERE job_url = ?")
            .bind(job_url)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(id) = id else {
            return Ok(false);
        };

        sqlx::query("UPDATE applications SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO status_history (application_id, status, updated_at, notes) VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .bind(notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Application {id} moved to status: {status}");
        Ok(true)
    }

    pub async fn application(&self, job_url: &str) -> Result<Option<ApplicationRecord>, StoreError> {
        let record = sqlx::query_as::<_, ApplicationRecord>(
            r#"
            SELECT id, job_url, company, title, source, match_score, status, applied_at, notes
            FROM applications WHERE job_url = ?
            "#,
        )
        .bind(job_url)
        .fetch_optional(self.pool())
        .await?;
        Ok(record)
    }

    /// Statuses recorded for an application, oldest first.
    pub async fn status_history(&self, job_url: &str) -> Result<Vec<String>, StoreError> {
        let statuses = sqlx::query_scalar(
            r#"
            SELECT h.status FROM status_history h
            JOIN applications a ON a.id = h.application_id
            WHERE a.job_url = ?
            ORDER BY h.id
            "#,
        )
        .bind(job_url)
        .fetch_all(self.pool())
        .await?;
        Ok(statuses)
    }
}
