//! Domain layer for toolgate
//!
//! Pure types and algorithms with no I/O: tool contracts, the approval state
//! machine, the smart-replace edit engine, plans, the content classifier and
//! the per-turn file cache.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A [`ToolDefinition`] advertises a tool and its argument schema, a
//! [`ToolCall`] invokes it, and every invocation ends in a [`ToolResult`].
//! Dangerous calls are tracked through [`ToolExecution`] so they cannot run
//! before a human approves them.
//!
//! ## Edits
//!
//! Models rarely reproduce file text byte-for-byte. [`smart_replace`] tries
//! exact, whitespace-normalized, fuzzy and line-based matching in that order
//! and refuses to guess between multiple candidates.

pub mod content;
pub mod edit;
pub mod plan;
pub mod text;
pub mod tool;
pub mod workspace;

pub use content::{ContentKind, RichContentItem, classify_binary, classify_resource, classify_text};
pub use edit::{
    BestMatch, EditAttempt, EditFailure, EditOutcome, EditStrategy, FUZZY_THRESHOLD,
    LineRangeEdit, LineRangeError, line_diff_stats, replace_line_range, smart_replace,
};
pub use plan::{Plan, PlanError, PlanItem, PlanItemStatus, PlanItemUpdate, PlanStatus};
pub use tool::{
    ApprovalState, ApprovalType, DefaultToolValidator, ErrorKind, ParameterSchema, ToolCall,
    ToolDefinition, ToolError, ToolExecution, ToolParameter, ToolResult, ToolResultMetadata,
    ToolValidator, TransitionError,
};
pub use workspace::{CachedFile, FileCache};
