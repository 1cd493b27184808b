//! Comment posting seam and run report renderers.
//!
//! The orchestrator posts through a [`CommentPoster`]; the GitHub client is
//! the production implementation and [`RecordingPoster`] backs `--dry-run`
//! and tests. Renderers turn the final [`RunReport`] into terminal or JSON
//! output.

pub mod json;
pub mod terminal;

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::comment::Disposition;
use crate::models::diff::DiffSide;
use crate::models::report::RunReport;

/// Errors from posting a single comment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PostError {
    /// The host rejected an inline comment because the line is not part of
    /// the diff. The caller downgrades it to a file-level note.
    #[error("line {line} of {path} is not part of the diff")]
    LineNotInDiff { path: String, line: u32 },

    #[error("API request failed with HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),
}

/// Destination for resolved review comments.
#[async_trait]
pub trait CommentPoster: Send + Sync {
    /// Post a comment anchored to one new-file line.
    async fn post_inline(
        &self,
        path: &str,
        line: u32,
        side: DiffSide,
        body: &str,
    ) -> Result<(), PostError>;

    /// Post a note attached to a file rather than a line.
    async fn post_file_level(&self, path: &str, body: &str) -> Result<(), PostError>;

    /// Publish the overall review summary. Posters without a summary
    /// concept accept and ignore it.
    async fn submit_summary(&self, _body: &str, _disposition: Disposition) -> Result<(), PostError> {
        Ok(())
    }
}

/// One call captured by [`RecordingPoster`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordedPost {
    Inline {
        path: String,
        line: u32,
        side: DiffSide,
        body: String,
    },
    FileLevel {
        path: String,
        body: String,
    },
    Summary {
        body: String,
        disposition: Disposition,
    },
}

/// Poster that records every call and always succeeds.
#[derive(Debug, Default)]
pub struct RecordingPoster {
    posts: Mutex<Vec<RecordedPost>>,
}

impl RecordingPoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything posted so far, in call order.
    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn record(&self, post: RecordedPost) {
        self.posts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(post);
    }
}

#[async_trait]
impl CommentPoster for RecordingPoster {
    async fn post_inline(
        &self,
        path: &str,
        line: u32,
        side: DiffSide,
        body: &str,
    ) -> Result<(), PostError> {
        self.record(RecordedPost::Inline {
            path: path.to_string(),
            line,
            side,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn post_file_level(&self, path: &str, body: &str) -> Result<(), PostError> {
        self.record(RecordedPost::FileLevel {
            path: path.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn submit_summary(&self, body: &str, disposition: Disposition) -> Result<(), PostError> {
        self.record(RecordedPost::Summary {
            body: body.to_string(),
            disposition,
        });
        Ok(())
    }
}

/// Trait for rendering a finished run to an output format.
pub trait OutputRenderer {
    fn render(&self, report: &RunReport) -> String;
}
