//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod approval_gate;
pub mod execute_tool_call;
