//! Safety gate for builder-initiated file writes.
//!
//! Two independent, side-effect free checks:
//! - [`can_modify_file`] classifies a path. Forbidden patterns are checked
//!   first and always win; otherwise the path must match the allow list.
//! - [`validate_file_content`] scans client-rendered source for dangerous
//!   constructs. Server routes under `app/api/` are not scanned (they can
//!   never be written anyway).
//!
//! A denial is fatal to the specific write only, never to the session.

mod patterns;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::OnceLock;

use patterns::{ALLOWED_PATHS, CLIENT_SOURCE_EXTENSIONS, DANGEROUS_CONTENT, FORBIDDEN_PATHS};

/// Result of a safety check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyVerdict {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SafetyVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Convert into a `Result`, carrying the denial reason as the error.
    pub fn into_result(self) -> Result<(), String> {
        if self.allowed {
            Ok(())
        } else {
            Err(self
                .reason
                .unwrap_or_else(|| "Denied by safety gate".to_string()))
        }
    }
}

struct SafetyGate {
    forbidden: Vec<(Regex, &'static str)>,
    allowed: Vec<Regex>,
    dangerous: Vec<(Regex, &'static str)>,
}

impl SafetyGate {
    fn compile() -> Self {
        // Paths match case-insensitively: `app/API/` is still an API route on
        // case-insensitive filesystems. Content is JavaScript, so it does not.
        let path_rule = |p: &str| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .build()
                .expect("safety pattern must compile")
        };
        let content_rule = |p: &str| Regex::new(p).expect("safety pattern must compile");
        Self {
            forbidden: FORBIDDEN_PATHS
                .iter()
                .map(|(p, label)| (path_rule(p), *label))
                .collect(),
            allowed: ALLOWED_PATHS.iter().map(|p| path_rule(p)).collect(),
            dangerous: DANGEROUS_CONTENT
                .iter()
                .map(|(p, label)| (content_rule(p), *label))
                .collect(),
        }
    }
}

fn gate() -> &'static SafetyGate {
    static GATE: OnceLock<SafetyGate> = OnceLock::new();
    GATE.get_or_init(SafetyGate::compile)
}

/// Normalize a user/model supplied path to repository-relative form.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}

/// Decide whether the builder may write `path`.
pub fn can_modify_file(path: &str) -> SafetyVerdict {
    let normalized = normalize_path(path);
    if normalized.is_empty() {
        return SafetyVerdict::deny("Cannot modify an empty path");
    }

    let gate = gate();

    if let Some((_, label)) = gate.forbidden.iter().find(|(re, _)| re.is_match(&normalized)) {
        return SafetyVerdict::deny(format!(
            "Cannot modify {}: {} files are protected",
            normalized, label
        ));
    }

    if gate.allowed.iter().any(|re| re.is_match(&normalized)) {
        SafetyVerdict::allow()
    } else {
        SafetyVerdict::deny(format!(
            "Cannot modify {}: only pages, components and styles are editable",
            normalized
        ))
    }
}

/// Whether content validation applies to `path`.
fn is_client_source(path: &str) -> bool {
    let path = path.to_lowercase();
    !path.starts_with("app/api/")
        && CLIENT_SOURCE_EXTENSIONS
            .iter()
            .any(|ext| path.ends_with(ext))
}

/// Scan proposed content for constructs that must not ship in client code.
pub fn validate_file_content(content: &str, path: &str) -> SafetyVerdict {
    let normalized = normalize_path(path);
    if !is_client_source(&normalized) {
        return SafetyVerdict::allow();
    }

    match gate().dangerous.iter().find(|(re, _)| re.is_match(content)) {
        Some((_, label)) => SafetyVerdict::deny(format!(
            "Content of {} contains a forbidden construct: {}",
            normalized, label
        )),
        None => SafetyVerdict::allow(),
    }
}

/// Run both checks, path first.
pub fn check_write(path: &str, content: &str) -> SafetyVerdict {
    let verdict = can_modify_file(path);
    if !verdict.allowed {
        return verdict;
    }
    validate_file_content(content, path)
}
