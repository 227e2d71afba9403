//! Safety classification tool.

use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;

use super::common::json_result;
use crate::mcp::types::CheckPathArgs;
use crate::safety;

/// Classify a path, and optionally proposed content, without writing anything.
pub fn check_path(args: CheckPathArgs) -> Result<CallToolResult, McpError> {
    let verdict = match &args.content {
        Some(content) => safety::check_write(&args.path, content),
        None => safety::can_modify_file(&args.path),
    };
    Ok(json_result(&verdict))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(args: CheckPathArgs) -> serde_json::Value {
        let result = check_path(args).unwrap();
        let text: String = result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect();
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_check_path() {
        let v = verdict(CheckPathArgs {
            path: "components/Header.tsx".to_string(),
            content: None,
        });
        assert_eq!(v["allowed"], true);

        let v = verdict(CheckPathArgs {
            path: "lib/stripe.ts".to_string(),
            content: None,
        });
        assert_eq!(v["allowed"], false);
        assert!(v["reason"].is_string());
    }

    #[test]
    fn test_check_path_with_content() {
        let v = verdict(CheckPathArgs {
            path: "components/Header.tsx".to_string(),
            content: Some("const key = process.env.SECRET".to_string()),
        });
        assert_eq!(v["allowed"], false);
    }
}
