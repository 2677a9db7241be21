// Prompt templates for the match analyzer.
// Placeholders are replaced with `str::replace` before sending.

/// Replace `{profile}` and `{posting}` before sending.
pub const MATCH_PROMPT_TEMPLATE: &str = r#"Analyze how well this candidate matches the job posting.

CANDIDATE PROFILE:
{profile}

JOB POSTING:
{posting}

Return a JSON object with this EXACT schema:
{
  "score": 0-100,
  "verdict": "one or two sentence summary",
  "strengths": ["up to 5 concrete strengths"],
  "gaps": ["up to 5 concrete gaps"]
}"#;

/// Replace `{resume}` before sending.
pub const PROFILE_PROMPT_TEMPLATE: &str = r#"Read this resume and derive the best job search to run for the candidate.

RESUME:
{resume}

Return a JSON object with this EXACT schema:
{
  "queries": ["1 to 3 job search queries, most relevant first"],
  "location": "preferred work location, or USA if unclear",
  "primary_title": "the candidate's current or target job title"
}"#;
