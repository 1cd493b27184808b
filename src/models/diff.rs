//! Diff-related types: file diffs, hunks, changes, and the derived
//! commentable-line maps.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The kind of a line in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Line exists only in the new version.
    Added,
    /// Line exists only in the old version.
    Deleted,
    /// Line is unchanged.
    Context,
}

/// A single line in a diff hunk.
///
/// At least one of `old_line` / `new_line` is always set: added lines carry
/// only `new_line`, deleted lines only `old_line`, context lines both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    /// The content of the line (without the leading +/-/space).
    pub content: String,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
}

impl Change {
    pub fn added(content: impl Into<String>, new_line: u32) -> Self {
        Self {
            kind: ChangeKind::Added,
            content: content.into(),
            old_line: None,
            new_line: Some(new_line),
        }
    }

    pub fn deleted(content: impl Into<String>, old_line: u32) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            content: content.into(),
            old_line: Some(old_line),
            new_line: None,
        }
    }

    pub fn context(content: impl Into<String>, old_line: u32, new_line: u32) -> Self {
        Self {
            kind: ChangeKind::Context,
            content: content.into(),
            old_line: Some(old_line),
            new_line: Some(new_line),
        }
    }
}

/// A contiguous hunk within a file diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Starting line in the old file.
    pub old_start: u32,
    /// Number of lines in the old file.
    pub old_count: u32,
    /// Starting line in the new file.
    pub new_start: u32,
    /// Number of lines in the new file.
    pub new_count: u32,
    /// Trailing section text after the closing `@@` (e.g. a procedure name).
    pub header: Option<String>,
    pub changes: Vec<Change>,
}

/// A diff for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Normalized repo-relative path: `new_path`, or `old_path` for deletions.
    pub path: String,
    /// Path before the change (`None` for new files).
    pub old_path: Option<String>,
    /// Path after the change (`None` for deleted files).
    pub new_path: Option<String>,
    pub is_new: bool,
    pub is_deleted: bool,
    pub is_rename: bool,
    pub is_binary: bool,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    /// Iterate over every change in every hunk, in diff order.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.hunks.iter().flat_map(|h| h.changes.iter())
    }

    /// Returns the total number of added lines across all hunks.
    pub fn added_lines(&self) -> usize {
        self.changes()
            .filter(|c| c.kind == ChangeKind::Added)
            .count()
    }

    /// Returns the total number of deleted lines across all hunks.
    pub fn deleted_lines(&self) -> usize {
        self.changes()
            .filter(|c| c.kind == ChangeKind::Deleted)
            .count()
    }
}

/// Which side of the diff a comment is attached to.
///
/// GitHub calls the head revision `RIGHT` and the base revision `LEFT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffSide {
    Left,
    Right,
}

impl DiffSide {
    /// The side on which a change of the given kind lives.
    pub fn of(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Deleted => DiffSide::Left,
            ChangeKind::Added | ChangeKind::Context => DiffSide::Right,
        }
    }
}

impl std::fmt::Display for DiffSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffSide::Left => write!(f, "LEFT"),
            DiffSide::Right => write!(f, "RIGHT"),
        }
    }
}

/// Path → ascending, de-duplicated new-file line numbers that may receive
/// an inline comment. Files in the diff with nothing commentable map to an
/// empty set rather than being absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LineWhitelist(pub IndexMap<String, BTreeSet<u32>>);

impl LineWhitelist {
    pub fn contains_file(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn contains(&self, path: &str, line: u32) -> bool {
        self.0.get(path).is_some_and(|lines| lines.contains(&line))
    }

    pub fn lines(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.0.get(path)
    }

    /// Total number of whitelisted lines across all files.
    pub fn total_lines(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    /// Path → ascending line list, the shape sent to the model.
    pub fn to_valid_lines(&self) -> IndexMap<String, Vec<u32>> {
        self.0
            .iter()
            .map(|(path, lines)| (path.clone(), lines.iter().copied().collect()))
            .collect()
    }
}

/// Path → new-file line → side tag, built alongside [`LineWhitelist`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SideMap(pub IndexMap<String, BTreeMap<u32, DiffSide>>);

impl SideMap {
    pub fn side(&self, path: &str, line: u32) -> Option<DiffSide> {
        self.0.get(path).and_then(|lines| lines.get(&line)).copied()
    }
}
