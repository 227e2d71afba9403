use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use super::github_deployer;
use crate::config::BuilderConfig;
use crate::domain::{summarize_changes, FileChange};
use crate::effects::{EffectOutcome, EffectRunner, PostCommitEffect};
use crate::files::LocalFiles;
use crate::safety;

/// Deploy files from the local working copy as a single commit.
pub async fn run_deploy(
    config: BuilderConfig,
    project_root: &Path,
    message: String,
    paths: Vec<String>,
    open_browser: bool,
) -> Result<()> {
    let deployer = github_deployer(&config)?;
    let effects = EffectRunner::new(PostCommitEffect::from_config(&config.deploy))?;
    let files = LocalFiles::new(project_root)?;

    let mut changes = Vec::with_capacity(paths.len());
    for path in &paths {
        let content = files
            .read_file_safe(path)
            .await
            .with_context(|| format!("Failed to read {}", path))?;
        changes.push(FileChange::new(safety::normalize_path(path), content));
    }

    println!("🚀 Deploying {}", summarize_changes(&changes));
    let result = deployer.deploy_to_github(&changes, &message, &effects).await;
    if !result.success {
        anyhow::bail!(
            "Deploy failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        );
    }

    println!("✅ Deployed commit {}", result.commit_sha.unwrap_or_default());
    for report in &result.effects {
        match &report.outcome {
            EffectOutcome::Ok => println!("   {}: ok", report.effect),
            EffectOutcome::Failed { error } => println!("⚠️  {}: {}", report.effect, error),
        }
    }

    if let Some(url) = result.commit_url {
        println!("   {}", url);
        if open_browser && open::that(&url).is_err() {
            warn!("Could not open browser automatically");
        }
    }
    Ok(())
}
