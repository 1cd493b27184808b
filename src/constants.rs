//! App-wide constants.
//!
//! Tool name, config paths, environment variable names and the marker text
//! used in posted comments live here so a rename touches one file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "revline";

/// Crate version, as reported by `revline --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local config filename (e.g. `.revline.toml` in repo root).
pub const CONFIG_FILENAME: &str = ".revline.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "revline";

/// Default GitHub REST endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Default context radius (lines before/after each commentable line).
pub const DEFAULT_CONTEXT_RADIUS: usize = 12;

/// Footer appended to every posted comment and summary.
pub const AI_DISCLOSURE: &str = "This review was generated by an AI model and may be inaccurate.";

/// Marker line prepended to file-level comments that could not be anchored.
pub const ANCHOR_FAILED_NOTE: &str = "Could not anchor this comment to a line in the diff";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PROVIDER: &str = "REVLINE_PROVIDER";
pub const ENV_MODEL: &str = "REVLINE_MODEL";
pub const ENV_API_KEY: &str = "REVLINE_API_KEY";
pub const ENV_BASE_URL: &str = "REVLINE_BASE_URL";
pub const ENV_MAX_COMMENTS: &str = "REVLINE_MAX_COMMENTS";
pub const ENV_CONTEXT_RADIUS: &str = "REVLINE_CONTEXT_RADIUS";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
