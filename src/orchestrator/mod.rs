//! Review orchestrator: prepare the engine's view of a diff, ask the model,
//! then anchor and post what comes back.
//!
//! [`prepare`] and [`publish`] are the two halves of a run; [`run_review`]
//! chains them around a single model call. Everything here consumes plain
//! data plus the injected resolver, provider and poster.

pub mod prompt;

use thiserror::Error;
use tracing::{info, warn};

use crate::anchor;
use crate::constants::{AI_DISCLOSURE, APP_NAME, DEFAULT_CONTEXT_RADIUS};
use crate::context::{self, resolver::FileResolver};
use crate::diff::{DiffError, filter::PathFilter, parser, whitelist};
use crate::models::comment::{ModelOutput, PostedComment};
use crate::models::context::{ContextPayload, ContextSnippet, PullRequestInfo};
use crate::models::diff::{FileDiff, LineWhitelist, SideMap};
use crate::models::report::RunReport;
use crate::output::{CommentPoster, PostError};
use crate::providers::{ProviderError, ReviewProvider};

/// Errors from the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Knobs the engine consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum comments to resolve (0 = unlimited).
    pub max_comments: usize,
    pub context_radius: usize,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_comments: 0,
            context_radius: DEFAULT_CONTEXT_RADIUS,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// Everything derived from one diff, held read-only for the rest of the run.
#[derive(Debug, Clone)]
pub struct PreparedReview {
    /// Files that survived the include/exclude filters.
    pub files: Vec<FileDiff>,
    pub whitelist: LineWhitelist,
    pub side_map: SideMap,
    pub snippets: Vec<ContextSnippet>,
    pub payload: ContextPayload,
    pub max_comments: usize,
}

impl PreparedReview {
    pub fn files_considered(&self) -> usize {
        self.files.len()
    }

    pub fn lines_whitelisted(&self) -> usize {
        self.whitelist.total_lines()
    }

    /// Nothing in the diff can receive a comment of any kind.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Parse, filter and analyse a diff.
///
/// A diff with zero files is valid and yields an empty review.
pub fn prepare(
    diff_text: &str,
    resolver: &dyn FileResolver,
    config: &EngineConfig,
    pr: &PullRequestInfo,
    extra_context: Option<&str>,
) -> Result<PreparedReview, DiffError> {
    let parsed = parser::parse_unified_diff(diff_text)?;
    let total = parsed.len();
    let files = PathFilter::new(&config.include, &config.exclude)?.apply(parsed);
    if files.len() < total {
        info!(kept = files.len(), total, "applied path filters");
    }

    let whitelist = whitelist::build_whitelist(&files);
    let side_map = whitelist::build_side_map(&files);
    let snippets = context::build_snippets(&files, resolver, config.context_radius);
    let metadata = context::collect_metadata(&files, resolver);
    let payload =
        context::build_context_payload(&snippets, &whitelist, metadata, pr, extra_context);

    info!(
        files = files.len(),
        lines = whitelist.total_lines(),
        "prepared review context"
    );

    Ok(PreparedReview {
        files,
        whitelist,
        side_map,
        snippets,
        payload,
        max_comments: config.max_comments,
    })
}

/// Anchor the model's comments and post them one by one.
///
/// Post failures never abort the run: an inline comment the host rejects
/// as outside the diff is re-posted as a file-level note, and any other
/// failure is counted and logged.
pub async fn publish(
    prepared: &PreparedReview,
    output: &ModelOutput,
    poster: &dyn CommentPoster,
) -> RunReport {
    let proposed = output.comments.len();
    let complete = anchor::count_complete(&output.comments);
    let resolved = anchor::resolve(
        &output.comments,
        &prepared.whitelist,
        &prepared.side_map,
        prepared.max_comments,
    );

    let mut report = RunReport {
        files_considered: prepared.files_considered(),
        lines_whitelisted: prepared.lines_whitelisted(),
        proposed,
        dropped: proposed - complete,
        truncated: complete - resolved.len(),
        summary: output.summary.clone(),
        disposition: output.disposition,
        ..Default::default()
    };

    for comment in resolved {
        match post_one(poster, &comment).await {
            Ok(()) => record(&mut report, comment),
            Err(PostError::LineNotInDiff { path, line }) => {
                warn!(path = %path, line, "host rejected inline comment, posting file-level note");
                let fallback = comment.into_fallback();
                match post_one(poster, &fallback).await {
                    Ok(()) => record(&mut report, fallback),
                    Err(e) => {
                        warn!(path = %fallback.path(), error = %e, "failed to post fallback note");
                        report.failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!(path = %comment.path(), error = %e, "failed to post comment");
                report.failed += 1;
            }
        }
    }

    if !report.summary.trim().is_empty() {
        let body = summary_body(&report);
        if let Err(e) = poster.submit_summary(&body, report.disposition).await {
            warn!(error = %e, "failed to submit review summary");
        }
    }

    info!(
        inline = report.inline,
        fallback = report.fallback,
        failed = report.failed,
        dropped = report.dropped,
        truncated = report.truncated,
        "review published"
    );
    report
}

/// Prepare, prompt the model once, and publish.
///
/// Diffs without relevant files skip the model call entirely.
pub async fn run_review(
    diff_text: &str,
    resolver: &dyn FileResolver,
    config: &EngineConfig,
    pr: &PullRequestInfo,
    extra_context: Option<&str>,
    provider: &dyn ReviewProvider,
    poster: &dyn CommentPoster,
) -> Result<RunReport, OrchestratorError> {
    let prepared = prepare(diff_text, resolver, config, pr, extra_context)?;
    if prepared.is_empty() {
        info!("nothing to review");
        return Ok(RunReport::default());
    }

    let system = prompt::system_prompt();
    let user = prompt::build_prompt(&prepared.payload);
    let output = provider.review(&system, &user).await?;
    Ok(publish(&prepared, &output, poster).await)
}

async fn post_one(poster: &dyn CommentPoster, comment: &PostedComment) -> Result<(), PostError> {
    let body = anchor::comment_body(comment);
    match comment {
        PostedComment::Inline {
            path, line, side, ..
        } => poster.post_inline(path, *line, *side, &body).await,
        PostedComment::FileLevel { path, .. } => poster.post_file_level(path, &body).await,
    }
}

fn record(report: &mut RunReport, comment: PostedComment) {
    if comment.is_inline() {
        report.inline += 1;
    } else {
        report.fallback += 1;
    }
    report.posted.push(comment);
}

/// Review body: the model's summary plus a short tally.
fn summary_body(report: &RunReport) -> String {
    let mut body = format!("### {APP_NAME} review\n\n{}\n", report.summary.trim());
    let posted = report.posted_total();
    if posted > 0 {
        body.push_str(&format!(
            "\n{posted} comment{} posted ({} inline, {} file-level).\n",
            if posted == 1 { "" } else { "s" },
            report.inline,
            report.fallback
        ));
    }
    body.push_str(&format!("\n---\n_{AI_DISCLOSURE}_"));
    body
}
