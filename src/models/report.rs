//! Run report: the counts a review run always ends with.

use serde::Serialize;

use super::comment::{Disposition, PostedComment};

/// Outcome of one review run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Changed files after include/exclude filtering.
    pub files_considered: usize,
    /// Total commentable lines across those files.
    pub lines_whitelisted: usize,
    /// Comments the model proposed.
    pub proposed: usize,
    /// Proposed comments missing a path, line, or remark.
    pub dropped: usize,
    /// Complete comments cut by the comment limit.
    pub truncated: usize,
    /// Inline comments successfully posted.
    pub inline: usize,
    /// File-level fallback notes successfully posted.
    pub fallback: usize,
    /// Comments the host failed to post.
    pub failed: usize,
    pub summary: String,
    pub disposition: Disposition,
    /// Every comment that was posted, in order.
    pub posted: Vec<PostedComment>,
}

impl RunReport {
    pub fn posted_total(&self) -> usize {
        self.inline + self.fallback
    }
}
