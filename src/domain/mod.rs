//! Domain types shared across modules.
//!
//! These are used by the tool loop, the preview store, the deploy pipeline and
//! the HTTP layer. Keeping them here avoids circular dependencies between
//! those modules.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A proposed full-content replacement for one file in the site repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileChange {
    /// Repository-relative path, e.g. `components/Header.tsx`
    pub path: String,
    /// Complete new file content
    pub content: String,
}

impl FileChange {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Human-readable one-line summary of a change set.
pub fn summarize_changes(files: &[FileChange]) -> String {
    match files.len() {
        0 => "No files changed".to_string(),
        1 => format!("1 file: {}", files[0].path),
        n => {
            let shown: Vec<&str> = files.iter().take(3).map(|f| f.path.as_str()).collect();
            if n > 3 {
                format!("{} files: {} and {} more", n, shown.join(", "), n - 3)
            } else {
                format!("{} files: {}", n, shown.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_changes() {
        assert_eq!(summarize_changes(&[]), "No files changed");

        let one = vec![FileChange::new("app/page.tsx", "x")];
        assert_eq!(summarize_changes(&one), "1 file: app/page.tsx");

        let many: Vec<FileChange> = (0..5)
            .map(|i| FileChange::new(format!("components/C{}.tsx", i), ""))
            .collect();
        let summary = summarize_changes(&many);
        assert!(summary.starts_with("5 files: components/C0.tsx"));
        assert!(summary.ends_with("and 2 more"));
    }
}
