//! Tolerant extraction of a JSON payload from free-form model output.
//!
//! Models wrap answers in prose, markdown fences, or both. Candidates are tried
//! in order and the first one that decodes wins:
//! 1. the body of the first fenced block (```` ```json ```` or bare ```` ``` ````),
//! 2. the whole trimmed text,
//! 3. the outermost `{...}` span and the outermost `[...]` span, whichever
//!    opens first tried first.

use serde_json::Value;

use super::ProviderError;

/// Isolates and decodes the JSON value inside `text`.
pub fn extract_json(text: &str) -> Result<Value, ProviderError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::EmptyContent);
    }

    let [first, second] = bracketed_spans(trimmed);
    let candidates = [fenced_body(trimmed), Some(trimmed), first, second];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Ok(value);
        }
    }

    Err(ProviderError::Malformed(format!(
        "no JSON payload in response: {}",
        preview(trimmed)
    )))
}

/// Body of the first fenced block. An unterminated fence runs to the end of text.
fn fenced_body(text: &str) -> Option<&str> {
    const FENCE: &str = "```";

    let open = text.find(FENCE)?;
    let after_fence = &text[open + FENCE.len()..];
    // Skip an info string such as `json` up to the end of the line.
    let body_start = match after_fence.find('\n') {
        Some(newline) if is_info_string(&after_fence[..newline]) => newline + 1,
        _ => after_fence
            .strip_prefix("json")
            .map(|_| "json".len())
            .unwrap_or(0),
    };
    let body = &after_fence[body_start..];
    let body = match body.find(FENCE) {
        Some(close) => &body[..close],
        None => body,
    };

    let body = body.trim();
    (!body.is_empty()).then_some(body)
}

fn is_info_string(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// First-open to last-close span for one bracket pair.
fn span(text: &str, open: char, close: char) -> Option<(usize, &str)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| (start, &text[start..=end]))
}

/// Object and array spans, earliest opening bracket first. Prose such as
/// `Score [0-100]:` ahead of the real object must not hide it.
fn bracketed_spans(text: &str) -> [Option<&str>; 2] {
    match (span(text, '{', '}'), span(text, '[', ']')) {
        (Some(object), Some(array)) if array.0 < object.0 => [Some(array.1), Some(object.1)],
        (object, array) => [object.map(|(_, s)| s), array.map(|(_, s)| s)],
    }
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Scored {
        score: u32,
    }

    fn scored(text: &str) -> Result<Scored, ProviderError> {
        serde_json::from_value(extract_json(text)?)
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }

    #[test]
    fn test_bare_json() {
        assert_eq!(extract_json(r#" {"score": 80} "#).unwrap(), json!({"score": 80}));
    }

    #[test]
    fn test_json_tagged_fence_inside_prose() {
        let text = "Here is the analysis:\n```json\n{\"score\": 64}\n```\nHope this helps!";
        assert_eq!(scored(text).unwrap(), Scored { score: 64 });
    }

    #[test]
    fn test_untagged_fence() {
        let text = "```\n[{\"title\": \"Engineer\"}]\n```";
        assert_eq!(extract_json(text).unwrap(), json!([{"title": "Engineer"}]));
    }

    #[test]
    fn test_fence_tag_on_same_line() {
        let text = "```json{\"score\": 12}```";
        assert_eq!(scored(text).unwrap(), Scored { score: 12 });
    }

    #[test]
    fn test_unterminated_fence() {
        let text = "```json\n{\"score\": 5}";
        assert_eq!(scored(text).unwrap(), Scored { score: 5 });
    }

    #[test]
    fn test_prose_around_object_without_fence() {
        let text = "Sure! {\"score\": 91} Let me know if you need more.";
        assert_eq!(scored(text).unwrap(), Scored { score: 91 });
    }

    #[test]
    fn test_bracketed_prose_before_object() {
        let text = r#"Score [0-100] below: {"score": 70, "verdict": "ok"}"#;
        assert_eq!(scored(text).unwrap(), Scored { score: 70 });
    }

    #[test]
    fn test_array_after_braced_prose() {
        let text = r#"Format {title, url}: [{"title": "Engineer"}]"#;
        assert_eq!(extract_json(text).unwrap(), json!([{"title": "Engineer"}]));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            extract_json("I cannot help with that."),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_is_empty_content() {
        assert!(matches!(extract_json("  \n "), Err(ProviderError::EmptyContent)));
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        assert!(matches!(
            scored(r#"{"verdict": "great"}"#),
            Err(ProviderError::Malformed(_))
        ));
    }
}
