//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.revline.toml` in repo root
//! 4. `~/.config/revline/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::constants::{
    DEFAULT_CONTEXT_RADIUS, ENV_API_KEY, ENV_BASE_URL, ENV_CONTEXT_RADIUS, ENV_GITHUB_API_URL,
    ENV_GITHUB_REPOSITORY, ENV_GITHUB_TOKEN, ENV_MAX_COMMENTS, ENV_MODEL, ENV_PROVIDER,
    GITHUB_API_URL,
};
use crate::env::Env;
use crate::models::ProviderName;
use crate::orchestrator::EngineConfig;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub review: ReviewConfig,
    pub provider: ProviderConfig,
    pub github: GitHubConfig,
}

/// Review engine knobs and review-level options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Maximum number of comments to post (0 = unlimited).
    pub max_comments: usize,
    /// Lines of file context on each side of a commentable line.
    pub context_radius: usize,
    /// Path globs to review; empty means every changed file.
    pub include: Vec<String>,
    /// Path globs to skip.
    pub exclude: Vec<String>,
    /// Free text passed to the model alongside the PR description.
    pub extra_context: Option<String>,
    /// Submit the model's disposition as the review event instead of a
    /// plain comment review.
    pub submit_disposition: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_comments: 0,
            context_radius: DEFAULT_CONTEXT_RADIUS,
            include: Vec::new(),
            exclude: Vec::new(),
            extra_context: None,
            submit_disposition: false,
        }
    }
}

impl ReviewConfig {
    /// The subset of settings the review engine consumes.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            max_comments: self.max_comments,
            context_radius: self.context_radius,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        }
    }
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: ProviderName::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            api_key: None,
        }
    }
}

/// GitHub API configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    /// `owner/repo`.
    pub repository: Option<String>,
    pub token: Option<String>,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("repository", &self.repository)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            repository: None,
            token: None,
        }
    }
}

/// One config file as written. Every key is optional so that an explicit
/// value overrides the layers below it even when it equals the default.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub review: ReviewLayer,
    pub provider: ProviderLayer,
    pub github: GitHubLayer,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReviewLayer {
    pub max_comments: Option<usize>,
    pub context_radius: Option<usize>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub extra_context: Option<String>,
    pub submit_disposition: Option<bool>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderLayer {
    pub name: Option<ProviderName>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubLayer {
    pub api_url: Option<String>,
    pub repository: Option<String>,
    pub token: Option<String>,
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, repo-local config, then applies
    /// environment variable overrides.
    pub fn load(repo_root: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: repo-local config
        if let Some(root) = repo_root {
            let local_path = root.join(crate::constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load one config file layer.
    pub fn load_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge a file layer into this config; every key the layer sets wins.
    fn merge(&mut self, layer: ConfigLayer) {
        let ConfigLayer {
            review,
            provider,
            github,
        } = layer;

        if let Some(n) = review.max_comments {
            self.review.max_comments = n;
        }
        if let Some(n) = review.context_radius {
            self.review.context_radius = n;
        }
        if let Some(globs) = review.include {
            self.review.include = globs;
        }
        if let Some(globs) = review.exclude {
            self.review.exclude = globs;
        }
        if review.extra_context.is_some() {
            self.review.extra_context = review.extra_context;
        }
        if let Some(enabled) = review.submit_disposition {
            self.review.submit_disposition = enabled;
        }

        if let Some(name) = provider.name {
            self.provider.name = name;
        }
        if let Some(model) = provider.model {
            self.provider.model = model;
        }
        if provider.base_url.is_some() {
            self.provider.base_url = provider.base_url;
        }
        if provider.api_key.is_some() {
            self.provider.api_key = provider.api_key;
        }

        if let Some(url) = github.api_url {
            self.github.api_url = url;
        }
        if github.repository.is_some() {
            self.github.repository = github.repository;
        }
        if github.token.is_some() {
            self.github.token = github.token;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        match env.parsed::<ProviderName>(ENV_PROVIDER) {
            Some(Ok(name)) => self.provider.name = name,
            Some(Err(raw)) => warn!("ignoring invalid {ENV_PROVIDER} value: {raw}"),
            None => {}
        }
        if let Some(val) = env.var(ENV_MODEL) {
            self.provider.model = val;
        }
        if let Some(val) = env.var(ENV_BASE_URL) {
            self.provider.base_url = Some(val);
        }

        // Provider-specific API key resolution
        let api_key = env
            .var(ENV_API_KEY)
            .or_else(|| env.var(self.provider.name.api_key_env_var()));
        if api_key.is_some() {
            self.provider.api_key = api_key;
        }

        match env.parsed::<usize>(ENV_MAX_COMMENTS) {
            Some(Ok(n)) => self.review.max_comments = n,
            Some(Err(raw)) => warn!("ignoring invalid {ENV_MAX_COMMENTS} value: {raw}"),
            None => {}
        }
        match env.parsed::<usize>(ENV_CONTEXT_RADIUS) {
            Some(Ok(n)) => self.review.context_radius = n,
            Some(Err(raw)) => warn!("ignoring invalid {ENV_CONTEXT_RADIUS} value: {raw}"),
            None => {}
        }

        if let Some(val) = env.var(ENV_GITHUB_TOKEN) {
            self.github.token = Some(val);
        }
        if let Some(val) = env.var(ENV_GITHUB_REPOSITORY) {
            self.github.repository = Some(val);
        }
        if let Some(val) = env.var(ENV_GITHUB_API_URL) {
            self.github.api_url = val;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.provider.name, ProviderName::Anthropic);
        assert_eq!(config.provider.model, "claude-sonnet-4-20250514");
        assert_eq!(config.review.max_comments, 0);
        assert_eq!(config.review.context_radius, 12);
        assert!(!config.review.submit_disposition);
        assert_eq!(config.github.api_url, "https://api.github.com");
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[review]
max_comments = 10
context_radius = 5
include = ["*.al"]
exclude = ["test/**"]
extra_context = "Business Central extension"

[provider]
name = "openai"
model = "gpt-4o"

[github]
repository = "contoso/bc-app"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.name, ProviderName::OpenAI);
        assert_eq!(config.provider.model, "gpt-4o");
        assert_eq!(config.review.max_comments, 10);
        assert_eq!(config.review.context_radius, 5);
        assert_eq!(config.review.include, vec!["*.al"]);
        assert_eq!(config.review.exclude, vec!["test/**"]);
        assert_eq!(config.github.repository.as_deref(), Some("contoso/bc-app"));
        assert_eq!(config.github.api_url, "https://api.github.com");
    }

    fn layer(toml_str: &str) -> ConfigLayer {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn merge_applies_every_key_the_layer_sets() {
        let mut base = Config::default();
        base.review.include = vec!["*.al".to_string()];

        base.merge(layer(
            r#"
[review]
max_comments = 5
context_radius = 3
submit_disposition = true

[provider]
name = "openai"
model = "gpt-4o"
base_url = "https://custom.api"
api_key = "sk-test"

[github]
repository = "o/r"
"#,
        ));

        assert_eq!(base.provider.name, ProviderName::OpenAI);
        assert_eq!(base.provider.model, "gpt-4o");
        assert_eq!(base.provider.base_url, Some("https://custom.api".to_string()));
        assert_eq!(base.provider.api_key, Some("sk-test".to_string()));
        assert_eq!(base.review.max_comments, 5);
        assert_eq!(base.review.context_radius, 3);
        assert!(base.review.submit_disposition);
        // Keys the layer leaves out keep the base value.
        assert_eq!(base.review.include, vec!["*.al"]);
        assert_eq!(base.github.repository.as_deref(), Some("o/r"));
    }

    #[test]
    fn merge_keeps_base_when_layer_is_empty() {
        let mut base = Config::default();
        base.provider.model = "custom".to_string();
        base.review.max_comments = 7;
        base.merge(ConfigLayer::default());
        assert_eq!(base.provider.model, "custom");
        assert_eq!(base.review.max_comments, 7);
    }

    #[test]
    fn later_layer_can_restore_default_values() {
        let mut config = Config::default();
        config.merge(layer(
            "[review]\nmax_comments = 5\ncontext_radius = 3\ninclude = [\"*.al\"]\nsubmit_disposition = true\n[provider]\nmodel = \"other\"\n",
        ));
        config.merge(layer(
            "[review]\nmax_comments = 0\ncontext_radius = 12\ninclude = []\nsubmit_disposition = false\n[provider]\nmodel = \"claude-sonnet-4-20250514\"\n",
        ));

        assert_eq!(config.review.max_comments, 0);
        assert_eq!(config.review.context_radius, 12);
        assert!(config.review.include.is_empty());
        assert!(!config.review.submit_disposition);
        assert_eq!(config.provider.model, "claude-sonnet-4-20250514");
    }

    #[test]
    fn env_vars_override_config() {
        let env = Env::mock([
            (ENV_PROVIDER, "gemini"),
            (ENV_MODEL, "gemini-2.5-pro"),
            (ENV_MAX_COMMENTS, "3"),
            (ENV_CONTEXT_RADIUS, "20"),
            (ENV_GITHUB_TOKEN, "ghp_x"),
            (ENV_GITHUB_REPOSITORY, "o/r"),
            ("GEMINI_API_KEY", "g-key"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);

        assert_eq!(config.provider.name, ProviderName::Gemini);
        assert_eq!(config.provider.model, "gemini-2.5-pro");
        assert_eq!(config.provider.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.review.max_comments, 3);
        assert_eq!(config.review.context_radius, 20);
        assert_eq!(config.github.token.as_deref(), Some("ghp_x"));
        assert_eq!(config.github.repository.as_deref(), Some("o/r"));
    }

    #[test]
    fn generic_api_key_wins_over_provider_specific() {
        let env = Env::mock([(ENV_API_KEY, "generic"), ("ANTHROPIC_API_KEY", "specific")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let env = Env::mock([
            (ENV_PROVIDER, "nonsense"),
            (ENV_MAX_COMMENTS, "many"),
            (ENV_CONTEXT_RADIUS, "-1"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.provider.name, ProviderName::Anthropic);
        assert_eq!(config.review.max_comments, 0);
        assert_eq!(config.review.context_radius, 12);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = Config::default();
        config.provider.api_key = Some("sk-secret".to_string());
        config.github.token = Some("ghp_secret".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn load_reads_repo_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".revline.toml"),
            "[review]\nmax_comments = 4\n[provider]\nmodel = \"local-model\"\n",
        )
        .unwrap();

        let config = Config::load(Some(dir.path()), &Env::mock(Vec::<(String, String)>::new()))
            .unwrap();
        assert_eq!(config.review.max_comments, 4);
        assert_eq!(config.provider.model, "local-model");
    }

    #[test]
    fn load_reports_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".revline.toml"), "[review\n").unwrap();
        let err = Config::load(Some(dir.path()), &Env::mock(Vec::<(String, String)>::new()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseFile { .. }));
    }

    #[test]
    fn engine_config_mirrors_review_settings() {
        let review = ReviewConfig {
            max_comments: 2,
            context_radius: 4,
            include: vec!["*.al".into()],
            ..Default::default()
        };
        let engine = review.engine();
        assert_eq!(engine.max_comments, 2);
        assert_eq!(engine.context_radius, 4);
        assert_eq!(engine.include, vec!["*.al"]);
        assert!(engine.exclude.is_empty());
    }
}
