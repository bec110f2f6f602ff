//! Built-in tool provider module
//!
//! Provides the BuiltinProvider which dispatches to the tool families in
//! `crate::tools`.

mod provider;

pub use provider::{BUILTIN_PROVIDER_ID, BuiltinProvider};
