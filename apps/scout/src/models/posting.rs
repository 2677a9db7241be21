use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which fetcher produced a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[serde(rename = "jsearch")]
    JSearch,
    Indeed,
    AiScout,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::JSearch => "jsearch",
            Source::Indeed => "indeed",
            Source::AiScout => "ai_scout",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jsearch" => Ok(Source::JSearch),
            "indeed" => Ok(Source::Indeed),
            "ai_scout" | "scout" => Ok(Source::AiScout),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

/// One canonical job listing. Every string field is always present,
/// empty when the source did not report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub url: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub source: Source,
    pub posted_at: Option<DateTime<Utc>>,
    pub employment_type: String,
    pub salary: String,
    /// 0 – 100. Computed per request, never persisted.
    pub local_score: u32,
}
