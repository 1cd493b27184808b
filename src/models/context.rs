//! Review context types: pull request metadata, context snippets, object
//! metadata, and the payload handed to the model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Pull request metadata passed through to the model untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: Option<u64>,
    pub title: String,
    pub description: String,
    /// Head revision; inline comments are anchored against it.
    pub head_sha: Option<String>,
    pub base_sha: Option<String>,
}

/// One rendered line of a context snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetLine {
    /// New-file line number (not a positional index).
    pub number: u32,
    pub text: String,
}

/// Numbered excerpt of a changed file around its commentable lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub path: String,
    /// Sorted by line number, no duplicates.
    pub lines: Vec<SnippetLine>,
    /// `true` when the live file was unavailable and only diff text was used.
    pub from_diff_only: bool,
}

/// Structural header information scanned from an AL object file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub path: String,
    /// Object kind keyword as written lowercased (e.g. `table`, `codeunit`).
    pub kind: String,
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub usings: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,
}

/// Per-file entry of the context payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContext {
    pub path: String,
    pub context_snippet_text: String,
}

/// Everything the model sees about the pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPayload {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_context: Option<String>,
    pub files: Vec<FileContext>,
    /// Path → ascending line numbers that may receive inline comments.
    pub valid_lines: IndexMap<String, Vec<u32>>,
    pub object_metadata: Vec<ObjectMetadata>,
}
