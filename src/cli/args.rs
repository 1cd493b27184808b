//! Clap argument types and input validation.

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use revline::models::report::RunReport;

/// Line-anchored AI review for pull requests.
#[derive(Parser, Debug)]
#[command(name = "revline", version = revline::constants::VERSION)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Review a diff and post line comments.
    Review(Box<ReviewArgs>),

    /// Print the context payload (or prompt) without calling a model.
    Payload(PayloadArgs),

    /// Print version information.
    Version,
}

/// Where the diff comes from. Shared by `review` and `payload`.
#[derive(Parser, Debug, Clone)]
pub struct InputArgs {
    /// Path to the repository or working directory (default: current directory).
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Pre-computed unified diff file.
    #[arg(long)]
    pub diff_file: Option<PathBuf>,

    /// Read unified diff from stdin.
    #[arg(long, default_value_t = false)]
    pub diff_stdin: bool,

    /// Branch or commit to diff against (uses git diff base...HEAD).
    #[arg(long)]
    pub diff_base: Option<String>,

    /// Pull request number. Without a local diff source the diff is fetched
    /// from GitHub; comments are posted to this pull request.
    #[arg(long)]
    pub pr: Option<u64>,
}

/// Engine knobs that can be set from the command line.
#[derive(Parser, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Lines of file context on each side of a commentable line.
    #[arg(long)]
    pub context_radius: Option<usize>,

    /// Only review paths matching these globs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Skip paths matching these globs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Extra free-text context passed to the model.
    #[arg(long)]
    pub extra_context: Option<String>,
}

/// Arguments for the `review` subcommand.
#[derive(Parser, Debug)]
pub struct ReviewArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Maximum comments to post (0 = unlimited).
    #[arg(long)]
    pub max_comments: Option<usize>,

    /// Output format for the run report.
    #[arg(long, default_value = "terminal")]
    pub format: OutputFormat,

    /// Resolve comments but do not post anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Submit the model's disposition (approve / request changes) as the
    /// review event instead of a plain comment.
    #[arg(long, default_value_t = false)]
    pub submit_disposition: bool,

    /// Exit non-zero when any comment failed to post.
    #[arg(long, default_value_t = false)]
    pub fail_on_post_error: bool,
}

/// Arguments for the `payload` subcommand.
#[derive(Parser, Debug)]
pub struct PayloadArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Print the full system and user prompt instead of the JSON payload.
    #[arg(long, default_value_t = false)]
    pub prompt: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

impl OutputFormat {
    /// Render a run report using the renderer for this format.
    pub fn render(&self, report: &RunReport) -> String {
        use revline::output::OutputRenderer;
        match self {
            OutputFormat::Terminal => revline::output::terminal::TerminalRenderer.render(report),
            OutputFormat::Json => revline::output::json::JsonRenderer.render(report),
        }
    }
}

impl InputArgs {
    /// Validate that at most one local diff source is given, and that some
    /// source exists at all.
    pub fn validate_input(&self) -> Result<InputMode, String> {
        let sources = [
            self.diff_file.is_some(),
            self.diff_stdin,
            self.diff_base.is_some(),
        ];
        let count = sources.iter().filter(|&&x| x).count();

        if count > 1 {
            return Err(
                "only one input source allowed: --diff-file, --diff-stdin, or --diff-base"
                    .to_string(),
            );
        }

        if let Some(ref path) = self.diff_file {
            Ok(InputMode::DiffFile(path.clone()))
        } else if self.diff_stdin {
            Ok(InputMode::Stdin)
        } else if let Some(ref base) = self.diff_base {
            Ok(InputMode::GitBase(base.clone()))
        } else if let Some(number) = self.pr {
            Ok(InputMode::PullRequest(number))
        } else {
            Err(
                "one input source is required: --diff-file, --diff-stdin, --diff-base, or --pr"
                    .to_string(),
            )
        }
    }
}

// InputMode is defined in models/ and re-exported here for convenience.
pub use revline::models::InputMode;
