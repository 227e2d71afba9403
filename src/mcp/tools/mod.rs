//! MCP tool implementations.

mod check_path;
mod common;
mod files;

pub use check_path::check_path;
pub use files::{list_files, read_file, search_code};
