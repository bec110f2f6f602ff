//! Workspace state shared across the tool calls of one turn.

pub mod file_cache;

pub use file_cache::{CachedFile, FileCache};
