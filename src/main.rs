//! revline: AI pull request review with diff-anchored comments.
//!
//! Entry point and error handling boundary. Uses `anyhow` for
//! ergonomic error propagation and user-facing messages.

mod cli;

use revline::config;
use revline::constants;
use revline::context;
use revline::diff;
use revline::env;
use revline::github;
use revline::models;
use revline::orchestrator;
use revline::output;
use revline::providers;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cli::args::{Cli, Command, EngineArgs, InputArgs, PayloadArgs, ReviewArgs};
use config::Config;
use context::resolver::DiskResolver;
use env::Env;
use github::GitHubClient;
use models::InputMode;
use models::context::PullRequestInfo;
use output::{CommentPoster, RecordingPoster};
use providers::rig::RigProvider;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Review(args) => run_review(*args).await,
        Command::Payload(args) => run_payload(args).await,
        Command::Version => run_version(),
    }
}

/// Log to stderr so stdout stays clean for reports and payloads.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={level}", constants::APP_NAME)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Print version information.
fn run_version() -> Result<()> {
    use colored::Colorize;

    println!(
        "{} {}",
        constants::APP_NAME.bold(),
        constants::VERSION.green().bold()
    );
    Ok(())
}

/// Everything resolved from the input flags before the engine runs.
struct Session {
    repo_root: PathBuf,
    config: Config,
    mode: InputMode,
    diff_text: String,
    pr: PullRequestInfo,
    client: Option<GitHubClient>,
}

/// Resolve the repo root, load config, fetch the diff and PR metadata.
async fn open_session(input: &InputArgs, engine: &EngineArgs) -> Result<Session> {
    let mode = input.validate_input().map_err(|e| anyhow::anyhow!(e))?;

    let repo_root = match diff::git::find_repo_root(&input.path).await {
        Ok(root) => PathBuf::from(root),
        Err(_) => input.path.clone(),
    };

    let mut config =
        Config::load(Some(repo_root.as_path()), &Env::real()).context("failed to load configuration")?;
    apply_engine_args(&mut config, engine);

    let client = match input.pr {
        Some(number) => Some(
            GitHubClient::new(&config.github, number)
                .context("failed to configure GitHub client")?,
        ),
        None => None,
    };

    let pr = match client {
        Some(ref client) => client
            .fetch_pull_request()
            .await
            .context("failed to fetch pull request")?,
        None => PullRequestInfo::default(),
    };

    let diff_text = match (&mode, &client) {
        (InputMode::PullRequest(_), Some(client)) => client
            .fetch_diff()
            .await
            .context("failed to fetch pull request diff")?,
        _ => diff::read_local_diff(&mode, &repo_root)
            .await
            .context("failed to read diff")?,
    };

    Ok(Session {
        repo_root,
        config,
        mode,
        diff_text,
        pr,
        client,
    })
}

/// CLI flags override config file and environment values.
fn apply_engine_args(config: &mut Config, engine: &EngineArgs) {
    if let Some(radius) = engine.context_radius {
        config.review.context_radius = radius;
    }
    if !engine.include.is_empty() {
        config.review.include = engine.include.clone();
    }
    if !engine.exclude.is_empty() {
        config.review.exclude = engine.exclude.clone();
    }
    if engine.extra_context.is_some() {
        config.review.extra_context = engine.extra_context.clone();
    }
}

/// Review a diff and post the anchored comments.
async fn run_review(args: ReviewArgs) -> Result<()> {
    let mut session = open_session(&args.input, &args.engine).await?;
    if let Some(max) = args.max_comments {
        session.config.review.max_comments = max;
    }
    if args.submit_disposition {
        session.config.review.submit_disposition = true;
    }

    let provider = RigProvider::new(session.config.provider.clone())
        .context("failed to configure model provider")?;
    let resolver = DiskResolver::new(&session.repo_root);

    let recorder = RecordingPoster::new();
    let github = match session.client.take() {
        Some(client) if !args.dry_run => {
            let head = match session.pr.head_sha.clone() {
                Some(sha) => Some(sha),
                None => local_head(&session.repo_root).await,
            };
            let mut client =
                client.with_submit_disposition(session.config.review.submit_disposition);
            if let Some(sha) = head {
                client = client.with_head_sha(sha);
            }
            Some(client)
        }
        _ => None,
    };
    let poster: &dyn CommentPoster = match github {
        Some(ref client) => client,
        None => {
            info!("no pull request target, comments are recorded only");
            &recorder
        }
    };

    let report = orchestrator::run_review(
        &session.diff_text,
        &resolver,
        &session.config.review.engine(),
        &session.pr,
        session.config.review.extra_context.as_deref(),
        &provider,
        poster,
    )
    .await?;

    print!("{}", args.format.render(&report));

    if args.fail_on_post_error && report.failed > 0 {
        anyhow::bail!("{} comment(s) failed to post", report.failed);
    }
    Ok(())
}

/// Print the context payload, or the full prompt, without calling a model.
async fn run_payload(args: PayloadArgs) -> Result<()> {
    let session = open_session(&args.input, &args.engine).await?;
    let resolver = DiskResolver::new(&session.repo_root);

    let prepared = orchestrator::prepare(
        &session.diff_text,
        &resolver,
        &session.config.review.engine(),
        &session.pr,
        session.config.review.extra_context.as_deref(),
    )?;
    info!(mode = ?session.mode, files = prepared.files_considered(), "payload built");

    if args.prompt {
        println!("{}", orchestrator::prompt::system_prompt());
        println!();
        println!("{}", orchestrator::prompt::build_prompt(&prepared.payload));
    } else {
        let json = serde_json::to_string_pretty(&prepared.payload)
            .context("failed to serialize payload")?;
        println!("{json}");
    }
    Ok(())
}

/// HEAD of the local checkout, used when the PR metadata lacks one.
async fn local_head(repo_root: &Path) -> Option<String> {
    match diff::git::head_sha(repo_root).await {
        Ok(sha) => Some(sha),
        Err(e) => {
            warn!(error = %e, "could not determine head revision");
            None
        }
    }
}
