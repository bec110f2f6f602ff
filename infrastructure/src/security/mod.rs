//! Workspace access checks.

pub mod path_guard;

pub use path_guard::{PathGuard, PathViolation};
