//! Side effects run after a deploy lands on the branch.
//!
//! Each effect runs independently and reports its own outcome. A failed
//! effect never turns a successful deploy into a failure.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::DeployConfig;
use crate::domain::FileChange;
use crate::github::DeployedCommit;

const HOOK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCommitEffect {
    /// POST to a hosting provider's deploy hook
    DeployHook { url: String },
    /// Append one JSON line per deploy
    DeploymentLog { path: PathBuf },
}

impl PostCommitEffect {
    pub fn name(&self) -> &'static str {
        match self {
            PostCommitEffect::DeployHook { .. } => "deploy_hook",
            PostCommitEffect::DeploymentLog { .. } => "deployment_log",
        }
    }

    /// Effects enabled by the deploy configuration.
    pub fn from_config(config: &DeployConfig) -> Vec<Self> {
        let mut effects = Vec::new();
        if let Some(url) = config.hook_url.as_ref().filter(|u| !u.trim().is_empty()) {
            effects.push(PostCommitEffect::DeployHook { url: url.clone() });
        }
        if let Some(path) = &config.log_path {
            effects.push(PostCommitEffect::DeploymentLog { path: path.clone() });
        }
        effects
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EffectOutcome {
    Ok,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectReport {
    pub effect: &'static str,
    pub outcome: EffectOutcome,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HookPayload<'a> {
    commit_sha: &'a str,
    commit_url: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct LoggedFile<'a> {
    path: &'a str,
    bytes: usize,
    sha256: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry<'a> {
    timestamp: String,
    commit_sha: &'a str,
    parent_sha: &'a str,
    commit_url: &'a str,
    message: &'a str,
    files: Vec<LoggedFile<'a>>,
}

fn content_digest(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Runs the configured effects after each successful deploy.
#[derive(Clone)]
pub struct EffectRunner {
    client: reqwest::Client,
    effects: Vec<PostCommitEffect>,
}

impl EffectRunner {
    pub fn new(effects: Vec<PostCommitEffect>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HOOK_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, effects })
    }

    pub fn effects(&self) -> &[PostCommitEffect] {
        &self.effects
    }

    pub async fn run(
        &self,
        commit: &DeployedCommit,
        files: &[FileChange],
        message: &str,
    ) -> Vec<EffectReport> {
        let mut reports = Vec::with_capacity(self.effects.len());
        for effect in &self.effects {
            let result = match effect {
                PostCommitEffect::DeployHook { url } => self.trigger_hook(url, commit, message).await,
                PostCommitEffect::DeploymentLog { path } => {
                    append_log(path, commit, files, message).await
                }
            };

            let outcome = match result {
                Ok(()) => {
                    info!("Post-commit effect {} succeeded", effect.name());
                    EffectOutcome::Ok
                }
                Err(e) => {
                    warn!("Post-commit effect {} failed: {:#}", effect.name(), e);
                    EffectOutcome::Failed {
                        error: format!("{:#}", e),
                    }
                }
            };
            reports.push(EffectReport {
                effect: effect.name(),
                outcome,
            });
        }
        reports
    }

    async fn trigger_hook(&self, url: &str, commit: &DeployedCommit, message: &str) -> Result<()> {
        let payload = HookPayload {
            commit_sha: &commit.sha,
            commit_url: &commit.url,
            message,
        };
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .context("Failed to reach deploy hook")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Deploy hook returned HTTP {}", status.as_u16());
        }
        Ok(())
    }
}

async fn append_log(
    path: &Path,
    commit: &DeployedCommit,
    files: &[FileChange],
    message: &str,
) -> Result<()> {
    let entry = LogEntry {
        timestamp: Utc::now().to_rfc3339(),
        commit_sha: &commit.sha,
        parent_sha: &commit.parent,
        commit_url: &commit.url,
        message,
        files: files
            .iter()
            .map(|f| LoggedFile {
                path: &f.path,
                bytes: f.content.len(),
                sha256: content_digest(&f.content),
            })
            .collect(),
    };
    let mut line = serde_json::to_string(&entry).context("Failed to encode log entry")?;
    line.push('\n');

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open deployment log {:?}", path))?;
    file.write_all(line.as_bytes())
        .await
        .with_context(|| format!("Failed to write deployment log {:?}", path))?;
    file.flush()
        .await
        .with_context(|| format!("Failed to flush deployment log {:?}", path))?;
    Ok(())
}
