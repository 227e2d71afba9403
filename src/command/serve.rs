use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::{github_deployer, loop_settings};
use crate::config::BuilderConfig;
use crate::effects::{EffectRunner, PostCommitEffect};
use crate::files::LocalFiles;
use crate::llm::OpenAiChatClient;
use crate::preview::PreviewStore;
use crate::server::{self, AppState};

pub async fn run_serve(config: BuilderConfig, project_root: &Path, bind: Option<String>) -> Result<()> {
    let files = LocalFiles::new(project_root)?;
    info!("Serving project at {}", files.root().display());

    let chat = match config.chat_api_key() {
        Ok(key) => Some(Arc::new(OpenAiChatClient::from_config(&config.chat, key)?)),
        Err(e) => {
            warn!("{}; chat endpoint disabled", e);
            None
        }
    };

    let deployer = match github_deployer(&config) {
        Ok(deployer) => Some(deployer),
        Err(e) => {
            warn!("{:#}; deploy endpoint disabled", e);
            None
        }
    };

    let effects = PostCommitEffect::from_config(&config.deploy);
    for effect in &effects {
        info!("Post-commit effect enabled: {}", effect.name());
    }

    let state = AppState {
        chat,
        files,
        previews: PreviewStore::new(),
        deployer,
        effects: EffectRunner::new(effects)?,
        loop_settings: loop_settings(&config, true),
    };

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    server::serve(state, &bind).await
}
