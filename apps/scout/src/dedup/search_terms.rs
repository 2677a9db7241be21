//! Stored search terms. A discovery run pivots to whatever titles and
//! locations are active here before falling back to configured defaults.

use tracing::info;

use super::SqlDedupStore;
use crate::errors::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TermType {
    Title,
    Location,
}

impl TermType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TermType::Title => "title",
            TermType::Location => "location",
        }
    }
}

impl SqlDedupStore {
    /// Adds a term. Adding an existing term is a no-op.
    pub async fn add_search_term(&self, term: &str, term_type: TermType) -> Result<(), StoreError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(StoreError::Validation("search term cannot be empty".to_string()));
        }

        sqlx::query("INSERT OR IGNORE INTO search_terms (term, term_type) VALUES (?, ?)")
            .bind(term)
            .bind(term_type.as_str())
            .execute(self.pool())
            .await?;
        info!("Added search {}: {term}", term_type.as_str());
        Ok(())
    }

    pub async fn delete_search_term(&self, term: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM search_terms WHERE term = ?")
            .bind(term.trim())
            .execute(self.pool())
            .await?;
        info!("Deleted search term: {term}");
        Ok(())
    }

    /// Active terms of one type, in insertion order.
    pub async fn search_terms(&self, term_type: TermType) -> Result<Vec<String>, StoreError> {
        let terms = sqlx::query_scalar(
            "SELECT term FROM search_terms WHERE term_type = ? AND is_active = 1 ORDER BY id",
        )
        .bind(term_type.as_str())
        .fetch_all(self.pool())
        .await?;
        Ok(terms)
    }
}
