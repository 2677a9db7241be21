use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Creates the SQLite pool backing the dedup/history store.
///
/// In-memory databases are per-connection, so they get a single connection.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool_options = if database_url.contains(":memory:") {
        // Closing the only connection would drop the database.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;

    ensure_schema(&pool).await?;
    info!("Store ready");
    Ok(pool)
}

/// Creates the store tables. Safe to run on every boot.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    const STATEMENTS: [&str; 4] = [
        r#"
        CREATE TABLE IF NOT EXISTS discovered_jobs (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            job_url       TEXT NOT NULL UNIQUE,
            first_seen_at TEXT NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            job_url     TEXT NOT NULL UNIQUE,
            company     TEXT NOT NULL,
            title       TEXT NOT NULL,
            source      TEXT NOT NULL,
            match_score INTEGER,
            status      TEXT NOT NULL DEFAULT 'submitted',
            applied_at  TEXT NOT NULL,
            notes       TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS status_history (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            application_id INTEGER NOT NULL REFERENCES applications(id),
            status         TEXT NOT NULL,
            updated_at     TEXT NOT NULL,
            notes          TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS search_terms (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            term      TEXT NOT NULL,
            term_type TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            UNIQUE(term, term_type)
        )
        "#,
    ];

    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
