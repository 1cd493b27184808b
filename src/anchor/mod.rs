//! Comment anchoring.
//!
//! Turns the model's untrusted [`ProposedComment`]s into [`PostedComment`]s:
//! incomplete proposals are dropped, the rest are truncated to the comment
//! limit and each one resolves to exactly one inline comment or one
//! anchor-failed file-level note. Nothing is ever silently lost after the
//! completeness check.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::constants::{AI_DISCLOSURE, ANCHOR_FAILED_NOTE};
use crate::diff::parser::normalize_path;
use crate::models::comment::{CommentContent, PostedComment, ProposedComment, ProposedLine};
use crate::models::diff::{DiffSide, LineWhitelist, SideMap};

/// A proposal with every required field present and non-blank.
struct Complete<'a> {
    path: &'a str,
    line: &'a ProposedLine,
    remark: &'a str,
    suggestion: Option<&'a str>,
}

fn complete(comment: &ProposedComment) -> Option<Complete<'_>> {
    let path = comment.path.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
    let line = comment.line.as_ref()?;
    let remark = comment.remark.as_deref().map(str::trim).filter(|r| !r.is_empty())?;
    Some(Complete {
        path,
        line,
        remark,
        suggestion: comment.suggestion.as_deref(),
    })
}

/// Number of proposals that survive the completeness check.
pub fn count_complete(proposed: &[ProposedComment]) -> usize {
    proposed.iter().filter(|c| complete(c).is_some()).count()
}

/// Resolve proposals against the whitelist and side map.
///
/// `max_count == 0` means unlimited. Order is preserved.
pub fn resolve(
    proposed: &[ProposedComment],
    whitelist: &LineWhitelist,
    side_map: &SideMap,
    max_count: usize,
) -> Vec<PostedComment> {
    let limit = if max_count == 0 { usize::MAX } else { max_count };

    proposed
        .iter()
        .filter_map(complete)
        .take(limit)
        .map(|c| anchor(c, whitelist, side_map))
        .collect()
}

fn anchor(comment: Complete<'_>, whitelist: &LineWhitelist, side_map: &SideMap) -> PostedComment {
    let content = CommentContent {
        remark: comment.remark.to_string(),
        suggestion: comment.suggestion.and_then(sanitize_suggestion),
    };

    let Some(line) = comment.line.number() else {
        debug!(path = comment.path, line = ?comment.line, "line is not a valid line number");
        return PostedComment::FileLevel {
            path: match_path(comment.path, whitelist)
                .unwrap_or_else(|| normalize_path(comment.path)),
            line: None,
            content,
            anchor_failed: true,
        };
    };

    let Some(path) = match_path(comment.path, whitelist) else {
        debug!(path = comment.path, "comment targets a file outside the diff");
        return PostedComment::FileLevel {
            path: normalize_path(comment.path),
            line: Some(line),
            content,
            anchor_failed: true,
        };
    };

    let anchored =
        whitelist.contains(&path, line) && side_map.side(&path, line) == Some(DiffSide::Right);

    if anchored {
        PostedComment::Inline {
            path,
            line,
            side: DiffSide::Right,
            content,
        }
    } else {
        debug!(path = %path, line, "line not commentable, falling back");
        PostedComment::FileLevel {
            path,
            line: Some(line),
            content,
            anchor_failed: true,
        }
    }
}

/// Find the whitelist key a model-supplied path refers to.
///
/// Models sometimes echo `a/` / `b/` prefixes or `./`; both normalize away.
fn match_path(raw: &str, whitelist: &LineWhitelist) -> Option<String> {
    let normalized = normalize_path(raw);
    if whitelist.contains_file(&normalized) {
        return Some(normalized);
    }
    ["a/", "b/"]
        .iter()
        .filter_map(|prefix| normalized.strip_prefix(prefix))
        .find(|p| whitelist.contains_file(p))
        .map(str::to_string)
}

static FENCE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(```|~~~)[A-Za-z0-9_+-]*\s*$").unwrap());

/// Strip fence delimiters the model may have wrapped its suggestion in.
///
/// Returns `None` when nothing but whitespace remains.
pub fn sanitize_suggestion(raw: &str) -> Option<String> {
    let kept: Vec<&str> = raw
        .lines()
        .filter(|line| !FENCE_LINE_RE.is_match(line))
        .collect();
    let cleaned = kept.join("\n").replace("```", "").replace("~~~", "");
    let cleaned = cleaned.trim_matches('\n');
    if cleaned.trim().is_empty() {
        None
    } else {
        Some(cleaned.trim_end().to_string())
    }
}

/// Render the markdown body for a posted comment.
pub fn comment_body(comment: &PostedComment) -> String {
    let content = comment.content();
    let mut body = String::new();

    if let PostedComment::FileLevel {
        line,
        anchor_failed: true,
        ..
    } = comment
    {
        match line {
            Some(line) => body.push_str(&format!("> {ANCHOR_FAILED_NOTE} (line {line}).\n\n")),
            None => body.push_str(&format!("> {ANCHOR_FAILED_NOTE}.\n\n")),
        }
    }

    body.push_str(&content.remark);

    if let Some(suggestion) = &content.suggestion {
        // File-level notes cannot carry an applicable suggestion block.
        let fence = if comment.is_inline() { "suggestion" } else { "" };
        body.push_str(&format!("\n\n```{fence}\n{suggestion}\n```"));
    }

    body.push_str(&format!("\n\n---\n_{AI_DISCLOSURE}_"));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parser::parse_unified_diff;
    use crate::diff::whitelist::{build_side_map, build_whitelist};
    use pretty_assertions::assert_eq;

    const DIFF: &str = "diff --git a/Sales.al b/Sales.al\n--- a/Sales.al\n+++ b/Sales.al\n@@ -41,0 +42,1 @@\n+    Amount := 0;\n";

    fn maps() -> (LineWhitelist, SideMap) {
        let files = parse_unified_diff(DIFF).unwrap();
        (build_whitelist(&files), build_side_map(&files))
    }

    #[test]
    fn whitelisted_line_resolves_inline() {
        let (wl, sides) = maps();
        let out = resolve(&[ProposedComment::new("Sales.al", 42, "X")], &wl, &sides, 0);
        assert_eq!(
            out,
            vec![PostedComment::Inline {
                path: "Sales.al".into(),
                line: 42,
                side: DiffSide::Right,
                content: CommentContent {
                    remark: "X".into(),
                    suggestion: None,
                },
            }]
        );
    }

    #[test]
    fn unknown_line_falls_back_to_file_level() {
        let (wl, sides) = maps();
        let out = resolve(&[ProposedComment::new("Sales.al", 999, "X")], &wl, &sides, 0);
        assert_eq!(out.len(), 1);
        match &out[0] {
            PostedComment::FileLevel {
                path,
                line,
                content,
                anchor_failed,
            } => {
                assert_eq!(path, "Sales.al");
                assert_eq!(*line, Some(999));
                assert_eq!(content.remark, "X");
                assert!(anchor_failed);
            }
            other => panic!("expected fallback, got {other:?}"),
        }
        let body = comment_body(&out[0]);
        assert!(body.contains(ANCHOR_FAILED_NOTE));
        assert!(body.contains("line 999"));
    }

    #[test]
    fn unknown_file_falls_back_too() {
        let (wl, sides) = maps();
        let out = resolve(&[ProposedComment::new("./Other.al", 1, "X")], &wl, &sides, 0);
        assert!(!out[0].is_inline());
        assert_eq!(out[0].path(), "Other.al");
    }

    #[test]
    fn prefixed_paths_still_anchor() {
        let (wl, sides) = maps();
        for raw in ["b/Sales.al", "./Sales.al", "a/Sales.al"] {
            let out = resolve(&[ProposedComment::new(raw, 42, "X")], &wl, &sides, 0);
            assert!(out[0].is_inline(), "path {raw}");
            assert_eq!(out[0].path(), "Sales.al");
        }
    }

    #[test]
    fn incomplete_proposals_are_dropped() {
        let (wl, sides) = maps();
        let proposed = vec![
            ProposedComment {
                path: None,
                ..ProposedComment::new("Sales.al", 42, "X")
            },
            ProposedComment {
                line: None,
                ..ProposedComment::new("Sales.al", 42, "X")
            },
            ProposedComment::new("Sales.al", 42, "   "),
            ProposedComment::new("", 42, "X"),
            ProposedComment::new("Sales.al", 42, "kept"),
        ];
        assert_eq!(count_complete(&proposed), 1);
        let out = resolve(&proposed, &wl, &sides, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content().remark, "kept");
    }

    #[test]
    fn unusable_line_numbers_fall_back_instead_of_dropping() {
        let (wl, sides) = maps();
        let reply: crate::models::comment::ModelOutput = serde_json::from_str(
            r#"{"summary": "s", "comments": [
                {"path": "Sales.al", "line": 0, "remark": "zero"},
                {"path": "Sales.al", "line": -5, "remark": "negative"},
                {"path": "b/Sales.al", "line": 5000000000, "remark": "huge"},
                {"path": "Sales.al", "line": "forty-two", "remark": "text"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(count_complete(&reply.comments), 4);
        let out = resolve(&reply.comments, &wl, &sides, 0);

        assert_eq!(out.len(), 4);
        for comment in &out {
            match comment {
                PostedComment::FileLevel {
                    path,
                    line,
                    anchor_failed,
                    ..
                } => {
                    assert_eq!(path, "Sales.al");
                    assert_eq!(*line, None);
                    assert!(anchor_failed);
                }
                other => panic!("expected file-level fallback, got {other:?}"),
            }
        }
        assert_eq!(
            comment_body(&out[0]),
            format!("> {ANCHOR_FAILED_NOTE}.\n\nzero\n\n---\n_{AI_DISCLOSURE}_")
        );
    }

    #[test]
    fn truncation_keeps_first_m_in_order() {
        let (wl, sides) = maps();
        let proposed: Vec<ProposedComment> = (0..5)
            .map(|i| ProposedComment::new("Sales.al", 42, &format!("c{i}")))
            .collect();
        let out = resolve(&proposed, &wl, &sides, 3);
        let remarks: Vec<&str> = out.iter().map(|c| c.content().remark.as_str()).collect();
        assert_eq!(remarks, vec!["c0", "c1", "c2"]);
        assert_eq!(resolve(&proposed, &wl, &sides, 0).len(), 5);
        assert_eq!(resolve(&proposed, &wl, &sides, 10).len(), 5);
    }

    #[test]
    fn truncation_applies_after_dropping() {
        let (wl, sides) = maps();
        let proposed = vec![
            ProposedComment::new("Sales.al", 42, ""),
            ProposedComment::new("Sales.al", 42, "a"),
            ProposedComment::new("Sales.al", 42, "b"),
        ];
        let out = resolve(&proposed, &wl, &sides, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].content().remark, "a");
    }

    #[test]
    fn suggestions_lose_fences() {
        assert_eq!(
            sanitize_suggestion("```al\n    Amount := 1;\n```").as_deref(),
            Some("    Amount := 1;")
        );
        assert_eq!(
            sanitize_suggestion("```suggestion\nx ```y```\n```").as_deref(),
            Some("x y")
        );
        assert_eq!(sanitize_suggestion("```\n```"), None);
        assert_eq!(sanitize_suggestion("   "), None);
    }

    #[test]
    fn inline_body_has_suggestion_block_and_disclosure() {
        let (wl, sides) = maps();
        let proposed = ProposedComment::new("Sales.al", 42, "Use a constant.")
            .with_suggestion("```\n    Amount := Zero;\n```");
        let out = resolve(&[proposed], &wl, &sides, 0);
        let body = comment_body(&out[0]);
        assert_eq!(
            body,
            format!(
                "Use a constant.\n\n```suggestion\n    Amount := Zero;\n```\n\n---\n_{AI_DISCLOSURE}_"
            )
        );
    }

    #[test]
    fn empty_suggestion_adds_no_block() {
        let (wl, sides) = maps();
        let proposed = ProposedComment::new("Sales.al", 42, "r").with_suggestion("");
        let out = resolve(&[proposed], &wl, &sides, 0);
        assert_eq!(out[0].content().suggestion, None);
        assert!(!comment_body(&out[0]).contains("```"));
    }
}
