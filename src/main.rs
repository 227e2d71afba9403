use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod agent;
mod cli;
mod command;
mod config;
mod domain;
mod effects;
mod files;
mod github;
mod llm;
mod mcp;
mod preview;
mod safety;
mod server;
mod tools;

use cli::{resolve_project_root, Cli, Commands};
use config::BuilderConfig;
use files::{GitHubFiles, LocalFiles, SiteFiles};
use github::GitHubClient;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        eprintln!("No command specified. Use --help for usage information.");
        eprintln!("Use 'ai-builder serve' to start the HTTP server or 'ai-builder mcp' to start the MCP server.");
        return Ok(());
    };

    match command {
        Commands::Serve { bind } => {
            let config = BuilderConfig::load(cli.config_dir.as_deref())?;
            let root = resolve_project_root(cli.project_root)?;
            command::run_serve(config, &root, bind).await?;
        }
        Commands::Chat { message, no_typing } => {
            let config = BuilderConfig::load(cli.config_dir.as_deref())?;
            let root = resolve_project_root(cli.project_root)?;
            command::run_chat(config, &root, message, !no_typing).await?;
        }
        Commands::Check { path, content_file } => {
            command::run_check(path, content_file).await?;
        }
        Commands::Deploy {
            message,
            paths,
            open,
        } => {
            let config = BuilderConfig::load(cli.config_dir.as_deref())?;
            let root = resolve_project_root(cli.project_root)?;
            command::run_deploy(config, &root, message, paths, open).await?;
        }
        Commands::Rollback { sha } => {
            let config = BuilderConfig::load(cli.config_dir.as_deref())?;
            command::run_rollback(config, sha).await?;
        }
        Commands::Mcp { remote } => {
            let files = if remote {
                let config = BuilderConfig::load(cli.config_dir.as_deref())?;
                SiteFiles::GitHub(GitHubFiles::new(GitHubClient::new(config.repo_target()?)?))
            } else {
                SiteFiles::Local(LocalFiles::new(resolve_project_root(cli.project_root)?)?)
            };
            mcp::run_mcp_server(files).await?;
        }
    }

    Ok(())
}
