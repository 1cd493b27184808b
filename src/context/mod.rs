//! Review context assembly.
//!
//! Builds the numbered snippets and object metadata for the changed files
//! and packs them, together with the whitelist and pull request metadata,
//! into the [`ContextPayload`] the model sees.

pub mod metadata;
pub mod resolver;
pub mod snippet;

use crate::models::context::{
    ContextPayload, ContextSnippet, FileContext, ObjectMetadata, PullRequestInfo,
};
use crate::models::diff::{FileDiff, LineWhitelist};

use resolver::FileResolver;

/// One context snippet per changed file, in diff order.
pub fn build_snippets(
    files: &[FileDiff],
    resolver: &dyn FileResolver,
    radius: usize,
) -> Vec<ContextSnippet> {
    files
        .iter()
        .map(|file| snippet::build_snippet(file, resolver, radius))
        .collect()
}

/// Metadata for every changed file that declares an object header.
pub fn collect_metadata(files: &[FileDiff], resolver: &dyn FileResolver) -> Vec<ObjectMetadata> {
    files
        .iter()
        .filter_map(|file| metadata::extract_metadata(file, resolver))
        .collect()
}

/// Assemble the payload sent to the model.
///
/// Title, description and extra context pass through untouched.
pub fn build_context_payload(
    snippets: &[ContextSnippet],
    whitelist: &LineWhitelist,
    object_metadata: Vec<ObjectMetadata>,
    pr: &PullRequestInfo,
    extra_context: Option<&str>,
) -> ContextPayload {
    let files = snippets
        .iter()
        .filter(|s| !s.lines.is_empty())
        .map(|s| FileContext {
            path: s.path.clone(),
            context_snippet_text: snippet::render_snippet(s),
        })
        .collect();

    ContextPayload {
        title: pr.title.clone(),
        description: pr.description.clone(),
        extra_context: extra_context
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        files,
        valid_lines: whitelist.to_valid_lines(),
        object_metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::parser::parse_unified_diff;
    use crate::diff::whitelist::build_whitelist;

    const DIFF: &str = "diff --git a/Sales.al b/Sales.al\n--- a/Sales.al\n+++ b/Sales.al\n@@ -1,2 +1,3 @@\n codeunit 50100 Sales\n+{\n }\ndiff --git a/gone.al b/gone.al\ndeleted file mode 100644\n--- a/gone.al\n+++ /dev/null\n@@ -1 +0,0 @@\n-x\n";

    #[test]
    fn payload_carries_snippets_lines_and_metadata() {
        let files = parse_unified_diff(DIFF).unwrap();
        let resolver = |path: &str| {
            (path == "Sales.al").then(|| "codeunit 50100 Sales\n{\n}\n".to_string())
        };
        let whitelist = build_whitelist(&files);
        let snippets = build_snippets(&files, &resolver, 2);
        let metadata = collect_metadata(&files, &resolver);
        let pr = PullRequestInfo {
            title: "Add Sales".into(),
            description: "Body".into(),
            ..Default::default()
        };

        let payload = build_context_payload(&snippets, &whitelist, metadata, &pr, Some("  "));

        assert_eq!(payload.title, "Add Sales");
        assert_eq!(payload.description, "Body");
        assert_eq!(payload.extra_context, None);
        assert_eq!(payload.files.len(), 1);
        assert_eq!(payload.files[0].path, "Sales.al");
        assert!(payload.files[0].context_snippet_text.starts_with("1: codeunit 50100 Sales"));
        assert_eq!(payload.valid_lines["Sales.al"], vec![1, 2, 3]);
        assert!(payload.valid_lines["gone.al"].is_empty());
        assert_eq!(payload.object_metadata.len(), 1);
        assert_eq!(payload.object_metadata[0].kind, "codeunit");
    }

    #[test]
    fn empty_diff_gives_empty_payload() {
        let files = parse_unified_diff("").unwrap();
        let whitelist = build_whitelist(&files);
        let snippets = build_snippets(&files, &resolver::NoFiles, 12);
        let metadata = collect_metadata(&files, &resolver::NoFiles);
        let payload = build_context_payload(
            &snippets,
            &whitelist,
            metadata,
            &PullRequestInfo::default(),
            Some("team conventions"),
        );
        assert!(payload.files.is_empty());
        assert!(payload.valid_lines.is_empty());
        assert!(payload.object_metadata.is_empty());
        assert_eq!(payload.extra_context.as_deref(), Some("team conventions"));
    }
}
