use anyhow::Result;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{github_deployer, loop_settings};
use crate::agent::{Conversation, StreamEvent, ToolLoop};
use crate::config::BuilderConfig;
use crate::effects::{EffectRunner, PostCommitEffect};
use crate::files::LocalFiles;
use crate::github::{DeployResult, Deployer, GitDatabase};
use crate::llm::{ChatMessage, OpenAiChatClient};
use crate::preview::{DeploymentPreview, PreviewStore};
use crate::tools::ToolExecutor;

/// One chat turn in the terminal, against the local working copy.
///
/// Previews proposed during the turn are shown in full afterwards and can be
/// deployed on the spot.
pub async fn run_chat(config: BuilderConfig, project_root: &Path, message: String, typing: bool) -> Result<()> {
    let api_key = config.chat_api_key()?;
    let chat = Arc::new(OpenAiChatClient::from_config(&config.chat, api_key)?);
    info!("Chat completions via model {}", chat.model());
    let files = LocalFiles::new(project_root)?;
    let previews = PreviewStore::new();

    let tool_loop = ToolLoop::new(
        chat,
        ToolExecutor::new(files, previews.clone()),
        loop_settings(&config, typing),
    );
    let (tx, mut rx) = mpsc::channel(32);
    let conversation = Conversation::new(vec![ChatMessage::user(message)]);
    let handle = tokio::spawn(async move { tool_loop.run(conversation, tx).await });

    let mut stdout = std::io::stdout();
    let mut failed = false;
    let mut preview_ids = Vec::new();
    while let Some(event) = rx.recv().await {
        let finished = event.is_terminal();
        if let Some(id) = preview_id(&event) {
            preview_ids.push(id);
        }
        match event {
            StreamEvent::ToolCalls { tool_calls } => {
                for call in tool_calls {
                    eprintln!("🔧 {} {}", call.name, call.arguments);
                }
            }
            StreamEvent::ToolResult { name, result, .. } => {
                if result["requiresApproval"] == true {
                    eprintln!("📝 Preview ready: {}", result["summary"].as_str().unwrap_or_default());
                } else {
                    eprintln!("✅ {}", name);
                }
            }
            StreamEvent::ToolError { name, error, .. } => eprintln!("⚠️  {}: {}", name, error),
            StreamEvent::Content { content } => {
                print!("{}", content);
                stdout.flush()?;
            }
            StreamEvent::Error { error } => {
                eprintln!("\n⚠️  {}", error);
                failed = true;
            }
            StreamEvent::Done => println!(),
        }
        if finished {
            break;
        }
    }
    handle.await?;

    if !preview_ids.is_empty() {
        let deployer = match github_deployer(&config) {
            Ok(deployer) => Some(deployer),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        };
        let effects = EffectRunner::new(PostCommitEffect::from_config(&config.deploy))?;
        let results = approve_previews(&previews, &preview_ids, deployer.as_ref(), &effects, ask_to_deploy).await?;
        for result in results {
            match (result.success, result.commit_url) {
                (true, Some(url)) => println!("✅ Deployed {}", url),
                (true, None) => println!("✅ Deployed"),
                (false, _) => {
                    eprintln!("❌ Deploy failed: {}", result.error.unwrap_or_default());
                    failed = true;
                }
            }
        }
    }

    if failed {
        anyhow::bail!("Chat ended with an error");
    }
    Ok(())
}

/// Id of the preview registered by a `preview_deployment` result.
fn preview_id(event: &StreamEvent) -> Option<String> {
    match event {
        StreamEvent::ToolResult { result, .. } if result["requiresApproval"] == true => {
            result["previewId"].as_str().map(str::to_string)
        }
        _ => None,
    }
}

fn print_preview(preview: &DeploymentPreview) {
    println!("\n📝 {} ({})", preview.message, preview.summary);
    for file in &preview.files {
        println!("\n--- {} ---", file.path);
        println!("{}", file.content);
    }
}

fn ask_to_deploy(preview: &DeploymentPreview) -> Result<bool> {
    print!("\nDeploy \"{}\" as one commit? [y/N]: ", preview.message);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Show each preview in full and deploy the approved ones, one commit each.
///
/// Without a deployer the previews are only shown. Declined previews are
/// discarded.
async fn approve_previews<G, F>(
    previews: &PreviewStore,
    ids: &[String],
    deployer: Option<&Deployer<G>>,
    effects: &EffectRunner,
    mut confirm: F,
) -> Result<Vec<DeployResult>>
where
    G: GitDatabase,
    F: FnMut(&DeploymentPreview) -> Result<bool>,
{
    let mut results = Vec::new();
    for id in ids {
        let Some(preview) = previews.get(id).await else {
            warn!("Preview {} is no longer available", id);
            continue;
        };
        print_preview(&preview);

        let Some(deployer) = deployer else {
            println!("GitHub deployment is not configured; the preview was not deployed.");
            continue;
        };
        if !confirm(&preview)? {
            previews.cancel(id).await;
            println!("Preview discarded.");
            continue;
        }

        let Some(preview) = previews.take(id).await else {
            continue;
        };
        let result = deployer
            .deploy_to_github(&preview.files, &preview.message, effects)
            .await;
        if !result.success {
            previews.restore(preview).await;
        }
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::LoopSettings;
    use crate::github::memory::MemoryRepo;
    use crate::llm::scripted::ScriptedChat;
    use std::time::Duration;
    use tempfile::TempDir;

    const NEW_HEADER: &str = "export function Header() { return <header>Studio Rentals</header> }";

    fn repo() -> Arc<MemoryRepo> {
        Arc::new(MemoryRepo::with_files(&[(
            "components/Header.tsx",
            "export function Header() { return <header>Studio</header> }",
        )]))
    }

    /// Run one scripted turn that proposes a preview; returns the ids seen.
    async fn chat_with_preview(dir: &TempDir, previews: &PreviewStore) -> Vec<String> {
        let args = serde_json::json!({
            "files": [{"path": "components/Header.tsx", "content": NEW_HEADER}],
            "message": "Rename header"
        })
        .to_string();
        let chat = ScriptedChat::new()
            .then_tools(&[("p1", "preview_deployment", args.as_str())])
            .then_text("Ready for your approval.");
        let tool_loop = ToolLoop::new(
            Arc::new(chat),
            ToolExecutor::new(LocalFiles::new(dir.path()).unwrap(), previews.clone()),
            LoopSettings {
                typing_delay: Duration::ZERO,
                max_iterations: 5,
            },
        );
        let (tx, mut rx) = mpsc::channel(32);
        tool_loop
            .run(Conversation::new(vec![ChatMessage::user("rename the header")]), tx)
            .await;

        let mut ids = Vec::new();
        while let Some(event) = rx.recv().await {
            ids.extend(preview_id(&event));
        }
        ids
    }

    #[tokio::test]
    async fn test_approved_preview_deploys_previewed_content() {
        let dir = TempDir::new().unwrap();
        let previews = PreviewStore::new();
        let ids = chat_with_preview(&dir, &previews).await;
        assert_eq!(ids.len(), 1);

        let repo = repo();
        let deployer = Deployer::new(repo.clone());
        let effects = EffectRunner::new(Vec::new()).unwrap();
        let results = approve_previews(&previews, &ids, Some(&deployer), &effects, |_| Ok(true))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(repo.history_len(), 2);
        assert_eq!(repo.message_of(&repo.head()), "Rename header");
        assert_eq!(repo.files_at(&repo.head())["components/Header.tsx"], NEW_HEADER);
        assert_eq!(previews.len().await, 0);
    }

    #[tokio::test]
    async fn test_declined_preview_is_discarded() {
        let dir = TempDir::new().unwrap();
        let previews = PreviewStore::new();
        let ids = chat_with_preview(&dir, &previews).await;

        let repo = repo();
        let deployer = Deployer::new(repo.clone());
        let effects = EffectRunner::new(Vec::new()).unwrap();
        let results = approve_previews(&previews, &ids, Some(&deployer), &effects, |_| Ok(false))
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(repo.history_len(), 1);
        assert_eq!(previews.len().await, 0);
    }

    #[tokio::test]
    async fn test_previews_kept_without_deployer() {
        let dir = TempDir::new().unwrap();
        let previews = PreviewStore::new();
        let ids = chat_with_preview(&dir, &previews).await;

        let results = approve_previews::<Arc<MemoryRepo>, _>(
            &previews,
            &ids,
            None,
            &EffectRunner::new(Vec::new()).unwrap(),
            |_| panic!("nothing to confirm without a deployer"),
        )
        .await
        .unwrap();
        assert!(results.is_empty());
        assert_eq!(previews.len().await, 1);
    }
}
