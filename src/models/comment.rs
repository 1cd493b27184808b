//! Model reply types and the resolved comments derived from them.
//!
//! Everything coming back from the model is untrusted: fields are optional,
//! accept a few common aliases, and tolerate the wrong JSON type where a
//! sensible reading exists (e.g. `"line": "42"`).

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::diff::DiffSide;

/// Spellings accepted for each comment field, most preferred first.
const PATH_KEYS: &[&str] = &["path", "file"];
const REMARK_KEYS: &[&str] = &["remark", "comment", "body", "message"];
const SUGGESTION_KEYS: &[&str] = &["suggestion"];

/// A comment proposed by the model, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ProposedComment {
    /// Repository-relative path of the file being commented on.
    pub path: Option<String>,
    /// New-file line number; must be one of the file's valid lines.
    #[schemars(with = "Option<u32>")]
    pub line: Option<ProposedLine>,
    /// The review remark.
    pub remark: Option<String>,
    /// Optional replacement text for the commented line.
    pub suggestion: Option<String>,
}

/// The `line` a model asked for.
///
/// `Invalid` keeps the raw value of anything that is present but cannot be
/// a new-file line number (`0`, `-5`, `1.5`, out of range, not numeric).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProposedLine {
    Valid(u32),
    Invalid(String),
}

impl ProposedLine {
    /// Classify a raw JSON value. `null` and blank strings are absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        let number = match value {
            Value::Null => return None,
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            }),
            Value::String(s) if s.trim().is_empty() => return None,
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        let raw = match value {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        Some(
            number
                .and_then(|l| u32::try_from(l).ok())
                .filter(|l| *l > 0)
                .map_or(ProposedLine::Invalid(raw), ProposedLine::Valid),
        )
    }

    pub fn number(&self) -> Option<u32> {
        match self {
            ProposedLine::Valid(line) => Some(*line),
            ProposedLine::Invalid(_) => None,
        }
    }
}

impl ProposedComment {
    pub fn new(path: &str, line: u32, remark: &str) -> Self {
        Self {
            path: Some(path.to_string()),
            line: Some(ProposedLine::Valid(line)),
            remark: Some(remark.to_string()),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    /// Read one untrusted comment entry.
    ///
    /// Each field takes the first accepted spelling that holds text, so an
    /// entry carrying both `remark` and `comment` still decodes. Entries that
    /// are not objects come back empty and are later counted as dropped.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };
        Self {
            path: first_text(map, PATH_KEYS),
            line: map.get("line").and_then(ProposedLine::from_value),
            remark: first_text(map, REMARK_KEYS),
            suggestion: first_text(map, SUGGESTION_KEYS),
        }
    }
}

impl<'de> Deserialize<'de> for ProposedComment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(ProposedComment::from_value(&value))
    }
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    })
}

/// Overall review verdict suggested by the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Approve,
    RequestChanges,
    #[default]
    Comment,
}

/// Closed-set deserializer: anything unrecognised becomes `Comment`.
impl<'de> Deserialize<'de> for Disposition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => Disposition::from_loose(&s),
            _ => Disposition::Comment,
        })
    }
}

impl Disposition {
    /// Normalize a free-form verdict string.
    pub fn from_loose(s: &str) -> Self {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "approve" | "approved" => Disposition::Approve,
            "request_changes" | "changes_requested" | "request_change" => {
                Disposition::RequestChanges
            }
            _ => Disposition::Comment,
        }
    }

    /// The GitHub pull request review event for this disposition.
    pub fn github_event(self) -> &'static str {
        match self {
            Disposition::Approve => "APPROVE",
            Disposition::RequestChanges => "REQUEST_CHANGES",
            Disposition::Comment => "COMMENT",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disposition::Approve => write!(f, "approve"),
            Disposition::RequestChanges => write!(f, "request_changes"),
            Disposition::Comment => write!(f, "comment"),
        }
    }
}

/// The canonical reply object extracted from the model response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelOutput {
    /// Overall summary of the pull request review.
    #[serde(default)]
    pub summary: String,
    /// Suggested verdict: approve, request_changes, or comment.
    #[serde(default, alias = "event", alias = "verdict")]
    pub disposition: Disposition,
    /// Line comments, in priority order.
    #[serde(default, deserialize_with = "lenient_comments")]
    #[schemars(with = "Vec<ProposedComment>")]
    pub comments: Vec<ProposedComment>,
}

/// One proposal per array entry; a non-array value means no comments.
fn lenient_comments<'de, D>(deserializer: D) -> Result<Vec<ProposedComment>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let entries = match value {
        Some(Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };
    Ok(entries.iter().map(ProposedComment::from_value).collect())
}

/// Validated remark text plus an optional sanitized suggestion block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentContent {
    pub remark: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// The resolved outcome of anchoring one proposed comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostedComment {
    /// Anchored to an exact new-file line.
    Inline {
        path: String,
        line: u32,
        side: DiffSide,
        #[serde(flatten)]
        content: CommentContent,
    },
    /// File-level note; `anchor_failed` marks a comment that wanted a line.
    FileLevel {
        path: String,
        /// The line the model asked for, kept for the note text.
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(flatten)]
        content: CommentContent,
        #[serde(rename = "anchorFailed")]
        anchor_failed: bool,
    },
}

impl PostedComment {
    pub fn path(&self) -> &str {
        match self {
            PostedComment::Inline { path, .. } | PostedComment::FileLevel { path, .. } => path,
        }
    }

    pub fn content(&self) -> &CommentContent {
        match self {
            PostedComment::Inline { content, .. } | PostedComment::FileLevel { content, .. } => {
                content
            }
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, PostedComment::Inline { .. })
    }

    /// Downgrade to an anchor-failed file-level note carrying the same content.
    pub fn into_fallback(self) -> Self {
        match self {
            PostedComment::Inline {
                path,
                line,
                content,
                ..
            } => PostedComment::FileLevel {
                path,
                line: Some(line),
                content,
                anchor_failed: true,
            },
            file_level @ PostedComment::FileLevel { .. } => file_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn proposed_comment_accepts_aliases_and_string_lines() {
        let c: ProposedComment =
            serde_json::from_str(r#"{"file": "Sales.al", "line": "42", "comment": "X"}"#).unwrap();
        assert_eq!(c, ProposedComment::new("Sales.al", 42, "X"));
    }

    #[test]
    fn present_but_unusable_lines_stay_invalid() {
        for (raw, kept) in [
            (r#"{"line": 0}"#, "0"),
            (r#"{"line": -3}"#, "-3"),
            (r#"{"line": "abc"}"#, "abc"),
            (r#"{"line": 1.5}"#, "1.5"),
            (r#"{"line": 5000000000}"#, "5000000000"),
            (r#"{"line": true}"#, "true"),
        ] {
            let c: ProposedComment = serde_json::from_str(raw).unwrap();
            assert_eq!(c.line, Some(ProposedLine::Invalid(kept.into())), "input: {raw}");
        }
        let c: ProposedComment = serde_json::from_str(r#"{"line": 7.0}"#).unwrap();
        assert_eq!(c.line, Some(ProposedLine::Valid(7)));
    }

    #[test]
    fn missing_null_or_blank_line_is_absent() {
        for raw in [r#"{}"#, r#"{"line": null}"#, r#"{"line": "  "}"#] {
            let c: ProposedComment = serde_json::from_str(raw).unwrap();
            assert_eq!(c.line, None, "input: {raw}");
        }
    }

    #[test]
    fn duplicate_spellings_take_the_preferred_key() {
        let c: ProposedComment = serde_json::from_str(
            r#"{"file": "Other.al", "path": "Sales.al", "line": 42, "comment": "dup", "remark": "X"}"#,
        )
        .unwrap();
        assert_eq!(c, ProposedComment::new("Sales.al", 42, "X"));

        let c: ProposedComment =
            serde_json::from_str(r#"{"path": "Sales.al", "line": 1, "remark": null, "body": "B"}"#)
                .unwrap();
        assert_eq!(c.remark.as_deref(), Some("B"));
    }

    #[test]
    fn disposition_normalizes_unknown_values() {
        assert_eq!(Disposition::from_loose("APPROVE"), Disposition::Approve);
        assert_eq!(Disposition::from_loose("request changes"), Disposition::RequestChanges);
        assert_eq!(Disposition::from_loose("changes-requested"), Disposition::RequestChanges);
        assert_eq!(Disposition::from_loose("lgtm"), Disposition::Comment);

        let out: ModelOutput =
            serde_json::from_str(r#"{"summary": "s", "disposition": "merge it"}"#).unwrap();
        assert_eq!(out.disposition, Disposition::Comment);
        let out: ModelOutput = serde_json::from_str(r#"{"summary": "s", "disposition": 5}"#).unwrap();
        assert_eq!(out.disposition, Disposition::Comment);
    }

    #[test]
    fn model_output_keeps_non_object_comments_as_empty_entries() {
        let out: ModelOutput = serde_json::from_str(
            r#"{"summary": "ok", "verdict": "approve", "comments": ["junk", 3, {"path": "a.al", "line": 1, "remark": "r"}]}"#,
        )
        .unwrap();
        assert_eq!(out.disposition, Disposition::Approve);
        assert_eq!(out.comments.len(), 3);
        assert_eq!(out.comments[0], ProposedComment::default());
        assert_eq!(out.comments[2].path.as_deref(), Some("a.al"));
    }

    #[test]
    fn model_output_missing_comments_is_empty() {
        let out: ModelOutput = serde_json::from_str(r#"{"summary": "nothing"}"#).unwrap();
        assert!(out.comments.is_empty());
        assert_eq!(out.disposition, Disposition::Comment);
    }

    #[test]
    fn fallback_keeps_content_and_line() {
        let inline = PostedComment::Inline {
            path: "a.al".into(),
            line: 4,
            side: DiffSide::Right,
            content: CommentContent {
                remark: "r".into(),
                suggestion: Some("s".into()),
            },
        };
        let fallback = inline.into_fallback();
        assert!(!fallback.is_inline());
        assert_eq!(fallback.path(), "a.al");
        assert_eq!(fallback.content().suggestion.as_deref(), Some("s"));
        match fallback {
            PostedComment::FileLevel { line, anchor_failed, .. } => {
                assert_eq!(line, Some(4));
                assert!(anchor_failed);
            }
            PostedComment::Inline { .. } => panic!("expected file-level"),
        }
    }

    #[test]
    fn posted_comment_serializes_with_kind_tag() {
        let c = PostedComment::FileLevel {
            path: "a.al".into(),
            line: None,
            content: CommentContent {
                remark: "r".into(),
                suggestion: None,
            },
            anchor_failed: true,
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["kind"], "file_level");
        assert_eq!(json["anchorFailed"], true);
        assert_eq!(json["remark"], "r");
    }
}
