use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::safety;

pub async fn run_check(path: String, content_file: Option<PathBuf>) -> Result<()> {
    let verdict = match content_file {
        Some(file) => {
            let content = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {:?}", file))?;
            safety::check_write(&path, &content)
        }
        None => safety::can_modify_file(&path),
    };

    match verdict.into_result() {
        Ok(()) => {
            println!("✅ {} may be modified", safety::normalize_path(&path));
            Ok(())
        }
        Err(reason) => {
            println!("❌ {}", reason);
            anyhow::bail!("Write denied")
        }
    }
}
