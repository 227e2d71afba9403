use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AI Builder - chat-driven site editing with safety-gated tools and single-commit deploys
#[derive(Parser)]
#[command(name = "ai-builder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Site project root (auto-detects git root if absent)
    #[arg(short = 'p', long, global = true, env = "AI_BUILDER_PROJECT_ROOT")]
    pub project_root: Option<String>,

    /// Directory holding config.json and the deployment log. Defaults to ~/.ai-builder
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (chat SSE + deploy endpoints)
    Serve {
        /// Address to bind, e.g. 127.0.0.1:3001
        #[arg(short, long, env = "AI_BUILDER_BIND")]
        bind: Option<String>,
    },
    /// Send one message to the builder and stream the reply to the terminal
    Chat {
        /// The message to send
        message: String,

        /// Print the answer at once instead of word by word
        #[arg(long)]
        no_typing: bool,
    },
    /// Check whether a path (and optionally its content) may be written
    Check {
        /// Repository-relative path
        path: String,

        /// File whose content should be scanned as the proposed content
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
    /// Deploy local files to the configured branch as one commit
    Deploy {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Repository-relative paths to deploy, read from the project root
        #[arg(required = true, num_args = 1..)]
        paths: Vec<String>,

        /// Open the commit page in a browser afterwards
        #[arg(long)]
        open: bool,
    },
    /// Force the branch back to an earlier commit
    Rollback {
        /// Commit SHA to restore
        sha: String,
    },
    /// Run as MCP server over stdio
    Mcp {
        /// Serve the configured GitHub branch instead of the local working copy
        #[arg(long)]
        remote: bool,
    },
}
