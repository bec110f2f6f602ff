//! Process execution adapters.

pub mod local;

pub use local::LocalProcessRunner;
