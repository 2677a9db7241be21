use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Durable dedup entry. Inserted once per URL, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SeenRecord {
    pub job_url: String,
    pub first_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRecord {
    pub id: i64,
    pub job_url: String,
    pub company: String,
    pub title: String,
    pub source: String,
    pub match_score: Option<i64>,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub notes: Option<String>,
}

