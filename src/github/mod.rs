//! GitHub REST client.
//!
//! Fetches pull request metadata and diffs, and implements
//! [`CommentPoster`] on top of the pull request review comment API.
//! File-level notes use `subject_type: file` review comments and fall back
//! to a plain issue comment when the file cannot take one (e.g. it is
//! deleted or binary).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GitHubConfig;
use crate::constants::{APP_NAME, VERSION};
use crate::models::comment::Disposition;
use crate::models::context::PullRequestInfo;
use crate::models::diff::DiffSide;
use crate::output::{CommentPoster, PostError};

const API_VERSION: &str = "2022-11-28";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";

/// Errors from GitHub API calls outside of comment posting.
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("missing GitHub configuration: {0}")]
    MissingConfig(String),

    #[error("invalid repository '{0}', expected owner/repo")]
    InvalidRepository(String),

    #[error("GitHub API request failed with HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("GitHub request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for GitHubError {
    fn from(e: reqwest::Error) -> Self {
        GitHubError::Transport(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct PullResponse {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    head: GitRef,
    base: GitRef,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    sha: String,
}

/// Client bound to one pull request.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    owner: String,
    repo: String,
    token: String,
    number: u64,
    head_sha: Option<String>,
    submit_disposition: bool,
}

impl GitHubClient {
    /// Build a client from config. Requires a token and an `owner/repo`.
    pub fn new(config: &GitHubConfig, number: u64) -> Result<Self, GitHubError> {
        let token = config.token.clone().ok_or_else(|| {
            GitHubError::MissingConfig(format!(
                "no token; set {}",
                crate::constants::ENV_GITHUB_TOKEN
            ))
        })?;
        let repository = config.repository.as_deref().ok_or_else(|| {
            GitHubError::MissingConfig(format!(
                "no repository; set {} or [github].repository",
                crate::constants::ENV_GITHUB_REPOSITORY
            ))
        })?;
        let (owner, repo) = split_repository(repository)?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            owner,
            repo,
            token,
            number,
            head_sha: None,
            submit_disposition: false,
        })
    }

    /// Anchor inline comments to this head revision.
    pub fn with_head_sha(mut self, sha: impl Into<String>) -> Self {
        self.head_sha = Some(sha.into());
        self
    }

    /// Submit the model's disposition as the review event.
    pub fn with_submit_disposition(mut self, enabled: bool) -> Self {
        self.submit_disposition = enabled;
        self
    }

    fn url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url, self.owner, self.repo, tail
        )
    }

    fn request(&self, method: reqwest::Method, url: &str, accept: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", format!("{APP_NAME}/{VERSION}"))
    }

    /// Fetch title, description and revisions of the pull request.
    pub async fn fetch_pull_request(&self) -> Result<PullRequestInfo, GitHubError> {
        let url = self.url(&format!("pulls/{}", self.number));
        let response = self
            .request(reqwest::Method::GET, &url, ACCEPT_JSON)
            .send()
            .await?;
        let response = check_status(response).await?;
        let pull: PullResponse = response.json().await?;

        Ok(PullRequestInfo {
            number: Some(pull.number),
            title: pull.title,
            description: pull.body.unwrap_or_default(),
            head_sha: Some(pull.head.sha),
            base_sha: Some(pull.base.sha),
        })
    }

    /// Fetch the pull request's unified diff.
    pub async fn fetch_diff(&self) -> Result<String, GitHubError> {
        let url = self.url(&format!("pulls/{}", self.number));
        let response = self
            .request(reqwest::Method::GET, &url, ACCEPT_DIFF)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.text().await?)
    }

    fn commit_id(&self) -> Result<&str, PostError> {
        self.head_sha
            .as_deref()
            .ok_or_else(|| PostError::MissingConfig("head revision of the pull request".into()))
    }

    async fn post_json(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<(), (u16, String)> {
        let response = self
            .request(reqwest::Method::POST, url, ACCEPT_JSON)
            .json(payload)
            .send()
            .await
            .map_err(|e| (0, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        Err((status.as_u16(), body))
    }

    async fn post_issue_comment(&self, body: &str) -> Result<(), PostError> {
        let url = self.url(&format!("issues/{}/comments", self.number));
        self.post_json(&url, &json!({ "body": body }))
            .await
            .map_err(|(status, message)| transport_or_api(status, message))
    }
}

#[async_trait]
impl CommentPoster for GitHubClient {
    async fn post_inline(
        &self,
        path: &str,
        line: u32,
        side: DiffSide,
        body: &str,
    ) -> Result<(), PostError> {
        let url = self.url(&format!("pulls/{}/comments", self.number));
        let payload = inline_payload(self.commit_id()?, path, line, side, body);
        debug!(path, line, "posting inline comment");
        self.post_json(&url, &payload)
            .await
            .map_err(|(status, message)| classify_post_failure(status, &message, path, line))
    }

    async fn post_file_level(&self, path: &str, body: &str) -> Result<(), PostError> {
        let url = self.url(&format!("pulls/{}/comments", self.number));
        let payload = file_level_payload(self.commit_id()?, path, body);
        debug!(path, "posting file-level comment");
        match self.post_json(&url, &payload).await {
            Ok(()) => Ok(()),
            Err((422, message)) => {
                warn!(path, %message, "file-level review comment rejected, posting on the conversation");
                self.post_issue_comment(&format!("**`{path}`**\n\n{body}")).await
            }
            Err((status, message)) => Err(transport_or_api(status, message)),
        }
    }

    async fn submit_summary(&self, body: &str, disposition: Disposition) -> Result<(), PostError> {
        let url = self.url(&format!("pulls/{}/reviews", self.number));
        let event = if self.submit_disposition {
            disposition.github_event()
        } else {
            Disposition::Comment.github_event()
        };
        let payload = json!({
            "commit_id": self.commit_id()?,
            "body": body,
            "event": event,
        });
        self.post_json(&url, &payload)
            .await
            .map_err(|(status, message)| transport_or_api(status, message))
    }
}

/// Payload for a line-anchored review comment.
pub fn inline_payload(
    commit_id: &str,
    path: &str,
    line: u32,
    side: DiffSide,
    body: &str,
) -> serde_json::Value {
    json!({
        "commit_id": commit_id,
        "path": path,
        "line": line,
        "side": side.to_string(),
        "body": body,
    })
}

/// Payload for a review comment attached to a whole file.
pub fn file_level_payload(commit_id: &str, path: &str, body: &str) -> serde_json::Value {
    json!({
        "commit_id": commit_id,
        "path": path,
        "subject_type": "file",
        "body": body,
    })
}

/// Map a failed inline post to a [`PostError`].
///
/// GitHub answers 422 with a validation message when the line is outside
/// the diff; that case is distinguished so the caller can fall back.
pub fn classify_post_failure(status: u16, message: &str, path: &str, line: u32) -> PostError {
    let lower = message.to_lowercase();
    let outside_diff = lower.contains("part of the diff")
        || lower.contains("could not be resolved")
        || lower.contains("line must be part");
    if status == 422 && outside_diff {
        PostError::LineNotInDiff {
            path: path.to_string(),
            line,
        }
    } else {
        transport_or_api(status, message.to_string())
    }
}

fn transport_or_api(status: u16, message: String) -> PostError {
    if status == 0 {
        PostError::Transport(message)
    } else {
        PostError::Api { status, message }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(GitHubError::Api {
        status: status.as_u16(),
        message,
    })
}

fn split_repository(repository: &str) -> Result<(String, String), GitHubError> {
    match repository.trim().split_once('/') {
        Some((owner, repo))
            if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
        {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GitHubError::InvalidRepository(repository.to_string())),
    }
}
