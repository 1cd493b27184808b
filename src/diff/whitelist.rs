//! Commentable-line whitelist and side map.
//!
//! Only new-file line numbers of added and context changes are eligible:
//! inline comments anchor to the head revision, so a line that exists only
//! on the old side can never receive one.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::diff::{ChangeKind, DiffSide, FileDiff, LineWhitelist, SideMap};

/// Whether a change of this kind may carry an inline comment.
pub fn is_commentable(kind: ChangeKind) -> bool {
    matches!(kind, ChangeKind::Added | ChangeKind::Context)
}

/// Ascending, de-duplicated commentable new-file lines of one file.
pub fn eligible_lines(file: &FileDiff) -> BTreeSet<u32> {
    file.changes()
        .filter(|c| is_commentable(c.kind))
        .filter_map(|c| c.new_line)
        .collect()
}

/// Build the whitelist for every file in the diff.
///
/// Every input file gets an entry, even when it has no eligible lines
/// (deleted and binary files map to an empty set).
pub fn build_whitelist(files: &[FileDiff]) -> LineWhitelist {
    LineWhitelist(
        files
            .iter()
            .map(|file| (file.path.clone(), eligible_lines(file)))
            .collect(),
    )
}

/// Build the side map for every file in the diff.
///
/// Keys per file are exactly the whitelist's lines for that file.
pub fn build_side_map(files: &[FileDiff]) -> SideMap {
    SideMap(
        files
            .iter()
            .map(|file| {
                let sides: BTreeMap<u32, DiffSide> = file
                    .changes()
                    .filter(|c| is_commentable(c.kind))
                    .filter_map(|c| c.new_line.map(|line| (line, DiffSide::of(c.kind))))
                    .collect();
                (file.path.clone(), sides)
            })
            .collect(),
    )
}
