//! Model response parsing.
//!
//! Models return the review object in many wrappings: bare, inside a
//! markdown fence, surrounded by prose, inside an array, or JSON-encoded a
//! second time as a string. Each candidate is classified into an
//! [`Envelope`] and unwrapped until an object with both a summary-like and
//! a comments-like field turns up. Everything else is ignored.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use super::ProviderError;
use crate::models::comment::ModelOutput;

/// Maximum length of response text to include in parse error messages.
const PARSE_ERROR_PREVIEW_LEN: usize = 2000;

/// How many string-in-string layers are unwrapped before giving up.
const MAX_UNWRAP_DEPTH: usize = 4;

const SUMMARY_KEYS: &[&str] = &["summary", "overview", "review_summary", "reviewSummary"];

const COMMENT_KEYS: &[&str] = &[
    "comments",
    "review_comments",
    "reviewComments",
    "line_comments",
    "lineComments",
];

const DISPOSITION_KEYS: &[&str] = &["disposition", "event", "verdict"];

/// Shapes a decoded JSON value can take.
#[derive(Debug)]
enum Envelope {
    Object(Map<String, Value>),
    List(Vec<Value>),
    Text(String),
    Other,
}

impl From<Value> for Envelope {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Envelope::Object(map),
            Value::Array(items) => Envelope::List(items),
            Value::String(s) => Envelope::Text(s),
            _ => Envelope::Other,
        }
    }
}

/// Parse the raw model response into a [`ModelOutput`].
///
/// An empty response is an empty review. A non-empty response without a
/// recognizable review object is a parse error.
pub fn parse_model_output(response: &str) -> Result<ModelOutput, ProviderError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Ok(ModelOutput::default());
    }

    for candidate in extract_json_candidates(trimmed) {
        let Ok(value) = serde_json::from_str::<Value>(&candidate) else {
            continue;
        };
        if let Some(output) = extract_canonical(value, 0) {
            return Ok(output);
        }
    }

    Err(ProviderError::ParseError(format!(
        "could not find a review object in the model response. Response: {}",
        preview(response)
    )))
}

/// Pull the canonical review object out of a decoded value.
///
/// Arrays yield their first matching element.
fn extract_canonical(value: Value, depth: usize) -> Option<ModelOutput> {
    if depth > MAX_UNWRAP_DEPTH {
        return None;
    }
    match Envelope::from(value) {
        Envelope::Object(map) => {
            if is_review_shape(&map) {
                return serde_json::from_value(Value::Object(canonical_keys(map)))
                    .map_err(|e| debug!(error = %e, "review-shaped object failed to decode"))
                    .ok();
            }
            None
        }
        Envelope::List(items) => items
            .into_iter()
            .find_map(|item| extract_canonical(item, depth + 1)),
        Envelope::Text(text) => extract_json_candidates(text.trim())
            .into_iter()
            .filter_map(|c| serde_json::from_str::<Value>(&c).ok())
            .find_map(|v| extract_canonical(v, depth + 1)),
        Envelope::Other => None,
    }
}

fn is_review_shape(map: &Map<String, Value>) -> bool {
    SUMMARY_KEYS.iter().any(|k| map.contains_key(*k))
        && COMMENT_KEYS.iter().any(|k| map.contains_key(*k))
}

/// Keep one spelling per field: the most preferred key present wins and
/// the other aliases are discarded, so the serde model never sees both.
fn canonical_keys(mut map: Map<String, Value>) -> Map<String, Value> {
    for keys in [SUMMARY_KEYS, COMMENT_KEYS, DISPOSITION_KEYS] {
        let present: Vec<Value> = keys.iter().filter_map(|k| map.remove(*k)).collect();
        if let Some(value) = present.into_iter().next() {
            map.insert(keys[0].to_string(), value);
        }
    }
    // The summary is free text; coerce stray non-string values.
    let summary = match map.get("summary") {
        Some(Value::String(_)) | None => None,
        Some(Value::Null) => Some(String::new()),
        Some(other) => Some(other.to_string()),
    };
    if let Some(summary) = summary {
        map.insert("summary".to_string(), Value::String(summary));
    }
    map
}

/// Regex for extracting content inside markdown code fences.
///
/// The closing fence must start a line so backticks inside JSON string
/// values (e.g. a suggestion with its own fence) do not end the match.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*\n(.*?)\n```").unwrap());

/// Candidate JSON strings from a response, most direct first: the text
/// itself, the outermost `{...}` slice, the outermost `[...]` slice, then
/// every fenced block.
fn extract_json_candidates(text: &str) -> Vec<String> {
    let mut candidates = vec![text.to_string()];

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (text.find(open), text.rfind(close)) {
            if start < end {
                let slice = &text[start..=end];
                if slice != text {
                    candidates.push(slice.to_string());
                }
            }
        }
    }

    for cap in FENCE_RE.captures_iter(text) {
        if let Some(inner) = cap.get(1) {
            let inner = inner.as_str().trim();
            if !inner.is_empty() {
                candidates.push(inner.to_string());
            }
        }
    }

    candidates
}

fn preview(response: &str) -> &str {
    let mut end = response.len().min(PARSE_ERROR_PREVIEW_LEN);
    while !response.is_char_boundary(end) {
        end -= 1;
    }
    &response[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::comment::{Disposition, ProposedLine};
    use pretty_assertions::assert_eq;

    const REVIEW: &str = r#"{
        "summary": "One problem.",
        "disposition": "request_changes",
        "comments": [
            {"path": "Sales.al", "line": 42, "remark": "X", "suggestion": "Amount := 0;"}
        ]
    }"#;

    #[test]
    fn parses_bare_object() {
        let out = parse_model_output(REVIEW).unwrap();
        assert_eq!(out.summary, "One problem.");
        assert_eq!(out.disposition, Disposition::RequestChanges);
        assert_eq!(out.comments.len(), 1);
        assert_eq!(out.comments[0].suggestion.as_deref(), Some("Amount := 0;"));
    }

    #[test]
    fn parses_fenced_object_with_prose() {
        let response = format!("Here is my review:\n\n```json\n{REVIEW}\n```\nThanks!");
        let out = parse_model_output(&response).unwrap();
        assert_eq!(out.comments[0].line, Some(ProposedLine::Valid(42)));
    }

    #[test]
    fn parses_string_wrapped_object() {
        let wrapped = serde_json::to_string(&REVIEW.to_string()).unwrap();
        let out = parse_model_output(&wrapped).unwrap();
        assert_eq!(out.summary, "One problem.");

        let twice = serde_json::to_string(&wrapped).unwrap();
        assert_eq!(parse_model_output(&twice).unwrap().comments.len(), 1);
    }

    #[test]
    fn array_envelope_picks_first_review_shaped_element() {
        let response = r#"[
            {"note": "thinking..."},
            "noise",
            {"summary": "first", "comments": []},
            {"summary": "second", "comments": [{"path": "a.al", "line": 1, "remark": "r"}]}
        ]"#;
        let out = parse_model_output(response).unwrap();
        assert_eq!(out.summary, "first");
        assert!(out.comments.is_empty());
    }

    #[test]
    fn array_of_string_wrapped_objects() {
        let inner = serde_json::to_string(&REVIEW.to_string()).unwrap();
        let response = format!("[{inner}]");
        assert_eq!(parse_model_output(&response).unwrap().summary, "One problem.");
    }

    #[test]
    fn alias_keys_are_accepted() {
        let out = parse_model_output(
            r#"{"overview": "ok", "review_comments": [{"file": "a.al", "line": "3", "body": "b"}], "verdict": "APPROVE"}"#,
        )
        .unwrap();
        assert_eq!(out.summary, "ok");
        assert_eq!(out.disposition, Disposition::Approve);
        assert_eq!(out.comments[0].path.as_deref(), Some("a.al"));
        assert_eq!(out.comments[0].line, Some(ProposedLine::Valid(3)));
    }

    #[test]
    fn duplicate_spellings_keep_every_comment() {
        let out = parse_model_output(
            r#"{"summary": "s", "overview": "o", "verdict": "approve", "disposition": "request_changes",
                "comments": [{"path": "Sales.al", "line": 42, "remark": "X", "comment": "dup"}],
                "review_comments": []}"#,
        )
        .unwrap();
        assert_eq!(out.summary, "s");
        assert_eq!(out.disposition, Disposition::RequestChanges);
        assert_eq!(out.comments.len(), 1);
        assert_eq!(out.comments[0].remark.as_deref(), Some("X"));
        assert_eq!(out.comments[0].line, Some(ProposedLine::Valid(42)));
    }

    #[test]
    fn objects_missing_either_field_are_ignored() {
        let err = parse_model_output(r#"{"summary": "no comments key"}"#).unwrap_err();
        assert!(err.to_string().contains("could not find a review object"));
        assert!(parse_model_output(r#"{"comments": []}"#).is_err());
        assert!(parse_model_output("just words").is_err());
    }

    #[test]
    fn unknown_disposition_becomes_comment() {
        let out = parse_model_output(r#"{"summary": "s", "comments": [], "disposition": "ship it"}"#)
            .unwrap();
        assert_eq!(out.disposition, Disposition::Comment);
    }

    #[test]
    fn empty_response_is_empty_review() {
        assert_eq!(parse_model_output("  \n").unwrap(), ModelOutput::default());
    }

    #[test]
    fn fence_inside_suggestion_does_not_break_parsing() {
        let response = "```json\n{\"summary\": \"s\", \"comments\": [{\"path\": \"a.al\", \"line\": 2, \"remark\": \"r\", \"suggestion\": \"```al\\nx\\n```\"}]}\n```";
        let out = parse_model_output(response).unwrap();
        assert_eq!(out.comments[0].suggestion.as_deref(), Some("```al\nx\n```"));
    }

    #[test]
    fn candidates_start_with_raw_text() {
        let candidates = extract_json_candidates("prose {\"a\": 1} more");
        assert_eq!(candidates[0], "prose {\"a\": 1} more");
        assert_eq!(candidates[1], "{\"a\": 1}");
    }
}
