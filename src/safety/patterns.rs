//! Pattern tables for the safety gate.
//!
//! Paths are matched after normalization (forward slashes, no leading `./`
//! or `/`). Each entry pairs a regex with the label used in denial reasons.

/// Paths that may never be modified, checked before the allow list.
pub(super) const FORBIDDEN_PATHS: &[(&str, &str)] = &[
    (r"(^|/)\.env", "environment file"),
    (r"^app/api/", "API route"),
    (r"^lib/stripe", "payment configuration"),
    (r"^lib/supabase", "database configuration"),
    (r"^lib/(email|resend)", "email configuration"),
    (r"^lib/(file-safety|github-deployer)\.", "builder safety module"),
    (r"^package\.json$", "dependency manifest"),
    (
        r"(^|/)(package-lock\.json|yarn\.lock|pnpm-lock\.yaml|bun\.lockb)$",
        "lockfile",
    ),
    (r"^next\.config\.(js|mjs|ts)$", "framework config"),
    (r"^(tsconfig\.json|middleware\.(ts|js)|vercel\.json)$", "framework config"),
    (r"(^|/)\.git(/|$)", "git internals"),
    (r"(^|/)node_modules(/|$)", "dependency directory"),
    (r"(^|/)\.\.(/|$)", "path traversal"),
];

/// Paths the builder is allowed to edit.
pub(super) const ALLOWED_PATHS: &[&str] = &[
    r"^app/.+\.(tsx|jsx)$",
    r"^components/.+\.(tsx|jsx)$",
    r"^app/globals\.css$",
    r"^styles/.+\.css$",
    r"^tailwind\.config\.(js|ts)$",
    r"^postcss\.config\.(js|mjs)$",
];

/// Constructs rejected in client-rendered source files.
pub(super) const DANGEROUS_CONTENT: &[(&str, &str)] = &[
    (r"\beval\s*\(", "dynamic code evaluation (eval)"),
    (r"\bnew\s+Function\s*\(", "Function constructor"),
    (
        r"dangerouslySetInnerHTML",
        "unsanitized HTML injection (dangerouslySetInnerHTML)",
    ),
    (
        r#"(require\s*\(\s*|from\s+|import\s*\(\s*)['"](node:)?child_process['"]"#,
        "process spawning (child_process)",
    ),
    (
        r#"(require\s*\(\s*|from\s+|import\s*\(\s*)['"](node:)?fs(/promises)?['"]"#,
        "filesystem access (fs)",
    ),
    (r"\bprocess\.env\b", "environment variable access (process.env)"),
];

/// Extensions treated as client-rendered source for content validation.
pub(super) const CLIENT_SOURCE_EXTENSIONS: &[&str] = &[".tsx", ".jsx", ".ts", ".js"];
