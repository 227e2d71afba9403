use anyhow::Result;

use super::github_deployer;
use crate::config::BuilderConfig;

pub async fn run_rollback(config: BuilderConfig, sha: String) -> Result<()> {
    let deployer = github_deployer(&config)?;
    let result = deployer.rollback_to_commit(&sha).await;

    if result.success {
        println!("⏪ Branch reset to {}", sha.trim());
        if let Some(url) = result.commit_url {
            println!("   {}", url);
        }
        Ok(())
    } else {
        anyhow::bail!(
            "Rollback failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        )
    }
}
