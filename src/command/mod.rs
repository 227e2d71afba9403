mod chat;
mod check;
mod deploy;
mod rollback;
mod serve;

pub use chat::run_chat;
pub use check::run_check;
pub use deploy::run_deploy;
pub use rollback::run_rollback;
pub use serve::run_serve;

use anyhow::{Context, Result};

use crate::agent::LoopSettings;
use crate::config::BuilderConfig;
use crate::github::{Deployer, GitHubClient};

/// Deployer for the configured repository.
fn github_deployer(config: &BuilderConfig) -> Result<Deployer<GitHubClient>> {
    let target = config
        .repo_target()
        .context("GitHub deployment is not configured")?;
    Ok(Deployer::new(GitHubClient::new(target)?))
}

fn loop_settings(config: &BuilderConfig, typing: bool) -> LoopSettings {
    LoopSettings {
        typing_delay: if typing {
            std::time::Duration::from_millis(config.chat.typing_delay_ms)
        } else {
            std::time::Duration::ZERO
        },
        max_iterations: config.chat.max_iterations,
    }
}
