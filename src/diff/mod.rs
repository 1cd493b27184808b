//! Diff engine: diff sources (file, stdin, git CLI), unified diff parsing,
//! commentable-line whitelists, and path filtering.

pub mod file;
pub mod filter;
pub mod git;
pub mod parser;
pub mod whitelist;

use std::path::Path;
use thiserror::Error;

use crate::models::InputMode;

/// Errors from the diff engine.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("git command failed: {0}")]
    GitError(String),

    #[error("failed to read diff: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("diff parse error: {0}")]
    ParseError(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("invalid path filter: {0}")]
    InvalidFilter(String),
}

/// Read a unified diff from stdin.
pub async fn read_diff_stdin() -> Result<String, DiffError> {
    use tokio::io::AsyncReadExt;
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .map_err(DiffError::FileReadError)?;
    Ok(buf)
}

/// Produce the raw diff text for a local input mode.
///
/// [`InputMode::PullRequest`] is fetched by the GitHub client instead and
/// is rejected here.
pub async fn read_local_diff(input: &InputMode, repo_root: &Path) -> Result<String, DiffError> {
    match input {
        InputMode::DiffFile(path) => file::read_diff_file(path).await,
        InputMode::Stdin => read_diff_stdin().await,
        InputMode::GitBase(base_ref) => git::git_diff(repo_root, base_ref).await,
        InputMode::PullRequest(number) => Err(DiffError::PathNotFound(format!(
            "pull request #{number} has no local diff source"
        ))),
    }
}
