//! Shared types used across all modules.
//!
//! Diffs, derived line maps, context payloads, model replies, and run
//! reports are defined here so the engine modules never reach into each
//! other's internals.

pub mod comment;
pub mod context;
pub mod diff;
pub mod report;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use comment::{CommentContent, Disposition, ModelOutput, PostedComment, ProposedComment};
pub use context::{ContextPayload, ContextSnippet, ObjectMetadata, PullRequestInfo};
pub use diff::{Change, ChangeKind, DiffSide, FileDiff, Hunk, LineWhitelist, SideMap};
pub use report::RunReport;

/// Where the unified diff for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Read a pre-computed unified diff from a file.
    DiffFile(PathBuf),
    /// Read a unified diff from stdin.
    Stdin,
    /// Diff the working tree against a git branch or commit.
    GitBase(String),
    /// Fetch the diff of a pull request from GitHub.
    PullRequest(u64),
}

/// Supported LLM provider backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Cohere,
    Gemini,
    Perplexity,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "xai")]
    XAI,
    Groq,
    /// Any OpenAI-compatible API (e.g. Ollama, Azure deployments, local servers).
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderName::Anthropic => "anthropic",
            ProviderName::OpenAI => "openai",
            ProviderName::Cohere => "cohere",
            ProviderName::Gemini => "gemini",
            ProviderName::Perplexity => "perplexity",
            ProviderName::DeepSeek => "deepseek",
            ProviderName::XAI => "xai",
            ProviderName::Groq => "groq",
            ProviderName::OpenAICompatible => "openai-compatible",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(ProviderName::Anthropic),
            "openai" => Ok(ProviderName::OpenAI),
            "cohere" => Ok(ProviderName::Cohere),
            "gemini" => Ok(ProviderName::Gemini),
            "perplexity" => Ok(ProviderName::Perplexity),
            "deepseek" => Ok(ProviderName::DeepSeek),
            "xai" => Ok(ProviderName::XAI),
            "groq" => Ok(ProviderName::Groq),
            "openai-compatible" | "azure" => Ok(ProviderName::OpenAICompatible),
            other => Err(format!(
                "unsupported provider: '{other}'. Supported: anthropic, openai, cohere, \
                 gemini, perplexity, deepseek, xai, groq, openai-compatible"
            )),
        }
    }
}

impl ProviderName {
    /// Provider-specific environment variable holding the API key.
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            ProviderName::Anthropic => "ANTHROPIC_API_KEY",
            ProviderName::OpenAI | ProviderName::OpenAICompatible => "OPENAI_API_KEY",
            ProviderName::Cohere => "COHERE_API_KEY",
            ProviderName::Gemini => "GEMINI_API_KEY",
            ProviderName::Perplexity => "PERPLEXITY_API_KEY",
            ProviderName::DeepSeek => "DEEPSEEK_API_KEY",
            ProviderName::XAI => "XAI_API_KEY",
            ProviderName::Groq => "GROQ_API_KEY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_roundtrips_through_display() {
        for name in [
            ProviderName::Anthropic,
            ProviderName::OpenAI,
            ProviderName::Cohere,
            ProviderName::Gemini,
            ProviderName::Perplexity,
            ProviderName::DeepSeek,
            ProviderName::XAI,
            ProviderName::Groq,
            ProviderName::OpenAICompatible,
        ] {
            assert_eq!(name.to_string().parse::<ProviderName>().unwrap(), name);
        }
    }

    #[test]
    fn provider_name_parse_is_case_insensitive_and_knows_azure() {
        assert_eq!("OpenAI".parse::<ProviderName>().unwrap(), ProviderName::OpenAI);
        assert_eq!(
            "azure".parse::<ProviderName>().unwrap(),
            ProviderName::OpenAICompatible
        );
        let err = "bogus".parse::<ProviderName>().unwrap_err();
        assert!(err.contains("unsupported provider"));
    }

    #[test]
    fn provider_name_serde_matches_display() {
        let json = serde_json::to_string(&ProviderName::OpenAICompatible).unwrap();
        assert_eq!(json, "\"openai-compatible\"");
        let back: ProviderName = serde_json::from_str("\"xai\"").unwrap();
        assert_eq!(back, ProviderName::XAI);
    }

    #[test]
    fn api_key_env_vars() {
        assert_eq!(ProviderName::Anthropic.api_key_env_var(), "ANTHROPIC_API_KEY");
        assert_eq!(ProviderName::OpenAICompatible.api_key_env_var(), "OPENAI_API_KEY");
        assert_eq!(ProviderName::Groq.api_key_env_var(), "GROQ_API_KEY");
    }
}
