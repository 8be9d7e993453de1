//! Tolerant JSON extraction from model output.
//!
//! Models asked for JSON frequently wrap it: markdown fences, a sentence of
//! preamble, a trailing apology. The parsers here accept that reality by
//! extracting the first balanced JSON value from the text before handing it
//! to serde. Schema violations come back as `None` / `Error::Parse` so each
//! pipeline component can apply its documented fallback.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;

/// Strip a ```json (or bare ```) fence if the payload is fenced.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_start = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };
    without_start
        .strip_suffix("```")
        .unwrap_or(without_start)
        .trim()
}

/// Scan for the first balanced value delimited by `open`/`close`,
/// string-aware so braces inside string literals don't confuse the count.
fn first_balanced(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the first balanced JSON object (`{…}`) from free-form text.
///
/// ```
/// use docsight::jsonx::extract_json_object;
///
/// let raw = "Sure! Here you go:\n```json\n{\"changed\": true}\n```\nHope that helps.";
/// assert_eq!(extract_json_object(raw), Some("{\"changed\": true}".to_string()));
///
/// assert_eq!(extract_json_object("no json here"), None);
/// ```
pub fn extract_json_object(raw: &str) -> Option<String> {
    let candidate = strip_fences(raw);
    first_balanced(candidate, '{', '}').map(str::to_string)
}

/// Extract the first balanced JSON array (`[…]`) from free-form text.
///
/// An object wrapping the array (e.g. `{"tasks": […]}`) is not unwrapped
/// here; callers that accept both shapes check for the object first.
pub fn extract_json_array(raw: &str) -> Option<String> {
    let candidate = strip_fences(raw);
    // An object appearing before any array means the top-level value is an
    // object, not an array with leading prose.
    match (candidate.find('['), candidate.find('{')) {
        (Some(a), Some(o)) if o < a => None,
        _ => first_balanced(candidate, '[', ']').map(str::to_string),
    }
}

/// Extract and deserialize the first JSON object in `raw` into `T`.
///
/// # Errors
///
/// `Error::Parse` when no balanced object exists or it fails to
/// deserialize into `T`.
pub fn parse_object<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let json = extract_json_object(raw)
        .ok_or_else(|| Error::parse(format!("no JSON object in model output: {}", preview(raw))))?;
    serde_json::from_str(&json)
        .map_err(|e| Error::parse(format!("JSON object did not match schema: {}", e)))
}

/// Extract and deserialize the first JSON array in `raw` into `T`.
pub fn parse_array<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let json = extract_json_array(raw)
        .ok_or_else(|| Error::parse(format!("no JSON array in model output: {}", preview(raw))))?;
    serde_json::from_str(&json)
        .map_err(|e| Error::parse(format!("JSON array did not match schema: {}", e)))
}

/// Short prefix of the raw output for error messages.
fn preview(raw: &str) -> String {
    const MAX: usize = 80;
    let trimmed = raw.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reformulated {
        reformulated: String,
        changed: bool,
    }

    #[test]
    fn test_extract_plain_object() {
        let raw = r#"{"a": 1}"#;
        assert_eq!(extract_json_object(raw), Some(r#"{"a": 1}"#.to_string()));
    }

    #[test]
    fn test_extract_fenced_object() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_object(raw), Some(r#"{"a": 1}"#.to_string()));
    }

    #[test]
    fn test_extract_object_with_surrounding_prose() {
        let raw = "Here is the classification you asked for: {\"needs_documents\": false} — done!";
        assert_eq!(
            extract_json_object(raw),
            Some(r#"{"needs_documents": false}"#.to_string())
        );
    }

    #[test]
    fn test_extract_nested_object_stops_at_balance() {
        let raw = r#"{"outer": {"inner": [1, 2]}} trailing {"second": true}"#;
        assert_eq!(
            extract_json_object(raw),
            Some(r#"{"outer": {"inner": [1, 2]}}"#.to_string())
        );
    }

    #[test]
    fn test_braces_inside_strings_do_not_break_balance() {
        let raw = r#"{"text": "a } inside", "n": 1}"#;
        assert_eq!(extract_json_object(raw), Some(raw.to_string()));
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let raw = r#"{"text": "she said \"}\"", "ok": true}"#;
        assert_eq!(extract_json_object(raw), Some(raw.to_string()));
    }

    #[test]
    fn test_extract_array() {
        let raw = "The plan:\n[{\"name\": \"t1\"}, {\"name\": \"t2\"}]";
        assert_eq!(
            extract_json_array(raw),
            Some(r#"[{"name": "t1"}, {"name": "t2"}]"#.to_string())
        );
    }

    #[test]
    fn test_array_not_extracted_from_object_field() {
        // The first [ sits inside an object; the top-level value is the object.
        let raw = r#"{"selected_pages": [1, 2]}"#;
        assert_eq!(extract_json_array(raw), None);
    }

    #[test]
    fn test_no_json_returns_none() {
        assert_eq!(extract_json_object("plain prose"), None);
        assert_eq!(extract_json_array("plain prose"), None);
        assert_eq!(extract_json_object("{unbalanced"), None);
    }

    #[test]
    fn test_parse_object_typed() {
        let raw = "```json\n{\"reformulated\": \"What is revenue?\", \"changed\": true}\n```";
        let parsed: Reformulated = parse_object(raw).unwrap();
        assert_eq!(
            parsed,
            Reformulated {
                reformulated: "What is revenue?".to_string(),
                changed: true,
            }
        );
    }

    #[test]
    fn test_parse_object_schema_mismatch() {
        let raw = r#"{"reformulated": 42}"#;
        let result: Result<Reformulated> = parse_object(raw);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_array_typed() {
        let raw = "[1, 2, 3]";
        let parsed: Vec<u32> = parse_array(raw).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
    }

    #[test]
    fn test_roundtrip_serialize_parse() {
        let original = serde_json::json!({"selected_pages": [2, 3], "reasoning": "tables"});
        let text = serde_json::to_string(&original).unwrap();
        let reparsed: serde_json::Value = parse_object(&text).unwrap();
        assert_eq!(original, reparsed);
    }
}
