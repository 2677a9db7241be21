use serde::{Deserialize, Serialize};

/// Maximum number of strengths or gaps kept on a match result.
pub const MAX_MATCH_POINTS: usize = 5;

/// Full semantic match produced by the match analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u32, // 0 – 100
    pub verdict: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    /// Provider name that produced the result, or "none" for degraded results.
    #[serde(default = "default_backend")]
    pub backend: String,
}

fn default_backend() -> String {
    "none".to_string()
}

impl MatchResult {
    /// Degraded result: zero score, explanatory verdict, non-empty placeholders.
    pub fn degraded(verdict: impl Into<String>) -> Self {
        Self {
            score: 0,
            verdict: verdict.into(),
            strengths: vec!["Analysis unavailable".to_string()],
            gaps: vec!["Analysis unavailable".to_string()],
            backend: default_backend(),
        }
    }
}

/// Search profile derived from a candidate's resume text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchProfile {
    /// Never empty.
    pub queries: Vec<String>,
    pub location: String,
    pub primary_title: Option<String>,
}

pub const DEFAULT_QUERY: &str = "Software Engineer";
pub const DEFAULT_LOCATION: &str = "USA";

impl Default for SearchProfile {
    fn default() -> Self {
        Self {
            queries: vec![DEFAULT_QUERY.to_string()],
            location: DEFAULT_LOCATION.to_string(),
            primary_title: None,
        }
    }
}
