//! Builder configuration.
//!
//! Values are resolved with the following priority:
//! 1. Environment variables (`OPENAI_API_KEY`, `GITHUB_TOKEN`, ...)
//! 2. `~/.ai-builder/config.json` (or a custom config directory)
//! 3. Built-in defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const ENV_CHAT_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_CHAT_URL: &str = "AI_BUILDER_CHAT_URL";
pub const ENV_CHAT_MODEL: &str = "AI_BUILDER_MODEL";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_OWNER: &str = "GITHUB_OWNER";
pub const ENV_GITHUB_REPO: &str = "GITHUB_REPO";
pub const ENV_GITHUB_BRANCH: &str = "GITHUB_BRANCH";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_DEPLOY_HOOK_URL: &str = "DEPLOY_HOOK_URL";

const CONFIG_DIR_NAME: &str = ".ai-builder";
const CONFIG_FILE_NAME: &str = "config.json";
const DEPLOY_LOG_FILE_NAME: &str = "deployments.jsonl";

pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_BIND: &str = "127.0.0.1:3001";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuilderConfig {
    pub chat: ChatConfig,
    pub github: GitHubConfig,
    pub deploy: DeployConfig,
    pub server: ServerConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub url: String,
    pub model: String,
    /// Delay between streamed content chunks
    pub typing_delay_ms: u64,
    /// Completion rounds allowed per chat request
    pub max_iterations: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            url: DEFAULT_CHAT_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            typing_delay_ms: 30,
            max_iterations: 10,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: String,
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            repo: None,
            branch: DEFAULT_BRANCH.to_string(),
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeployConfig {
    /// Optional URL POSTed after a successful push (e.g. a hosting deploy hook)
    pub hook_url: Option<String>,
    /// Deployment history file; defaults to ~/.ai-builder/deployments.jsonl
    pub log_path: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Fully specified target repository.
#[derive(Clone)]
pub struct RepoTarget {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub api_url: String,
}

impl std::fmt::Debug for RepoTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoTarget")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_url", &self.api_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl BuilderConfig {
    /// Default config directory: ~/.ai-builder
    pub fn default_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .context("Could not determine home directory")?
            .join(CONFIG_DIR_NAME))
    }

    /// Load from `config_dir` (or the default directory), then apply env overrides.
    pub fn load(config_dir: Option<&Path>) -> Result<Self> {
        let dir = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => Self::default_dir()?,
        };
        let path = dir.join(CONFIG_FILE_NAME);

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: BuilderConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            info!("Loaded configuration from {}", path.display());
            config
        } else {
            debug!("No config file at {}, using defaults", path.display());
            BuilderConfig::default()
        };

        config.apply_env();
        if config.deploy.log_path.is_none() {
            config.deploy.log_path = Some(dir.join(DEPLOY_LOG_FILE_NAME));
        }
        config.validate()?;
        Ok(config)
    }

    /// Environment variables take priority over file values.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_value(ENV_CHAT_API_KEY) {
            self.chat.api_key = Some(v);
        }
        if let Some(v) = env_value(ENV_CHAT_URL) {
            self.chat.url = v;
        }
        if let Some(v) = env_value(ENV_CHAT_MODEL) {
            self.chat.model = v;
        }
        if let Some(v) = env_value(ENV_GITHUB_TOKEN) {
            self.github.token = Some(v);
        }
        if let Some(v) = env_value(ENV_GITHUB_OWNER) {
            self.github.owner = Some(v);
        }
        if let Some(v) = env_value(ENV_GITHUB_REPO) {
            self.github.repo = Some(v);
        }
        if let Some(v) = env_value(ENV_GITHUB_BRANCH) {
            self.github.branch = v;
        }
        if let Some(v) = env_value(ENV_GITHUB_API_URL) {
            self.github.api_url = v;
        }
        if let Some(v) = env_value(ENV_DEPLOY_HOOK_URL) {
            self.deploy.hook_url = Some(v);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "chat.maxIterations must be greater than 0".to_string(),
            ));
        }
        if self.github.branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "github.branch must not be empty".to_string(),
            ));
        }
        url::Url::parse(&self.chat.url)
            .map_err(|e| ConfigError::InvalidValue(format!("chat.url: {}", e)))?;
        url::Url::parse(&self.github.api_url)
            .map_err(|e| ConfigError::InvalidValue(format!("github.apiUrl: {}", e)))?;
        Ok(())
    }

    pub fn chat_api_key(&self) -> Result<&str, ConfigError> {
        self.chat
            .api_key
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_CHAT_API_KEY))
    }

    /// The deploy target, if every GitHub setting is present.
    pub fn repo_target(&self) -> Result<RepoTarget, ConfigError> {
        let gh = &self.github;
        Ok(RepoTarget {
            token: gh.token.clone().ok_or(ConfigError::Missing(ENV_GITHUB_TOKEN))?,
            owner: gh.owner.clone().ok_or(ConfigError::Missing(ENV_GITHUB_OWNER))?,
            repo: gh.repo.clone().ok_or(ConfigError::Missing(ENV_GITHUB_REPO))?,
            branch: gh.branch.clone(),
            api_url: gh.api_url.clone(),
        })
    }
}

impl std::fmt::Debug for BuilderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("BuilderConfig")
            .field("chat.url", &self.chat.url)
            .field("chat.model", &self.chat.model)
            .field("chat.api_key", &redact(&self.chat.api_key))
            .field("github.owner", &self.github.owner)
            .field("github.repo", &self.github.repo)
            .field("github.branch", &self.github.branch)
            .field("github.token", &redact(&self.github.token))
            .field("deploy", &self.deploy)
            .field("server", &self.server)
            .finish()
    }
}
