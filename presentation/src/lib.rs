//! Presentation layer for toolgate
//!
//! This crate contains the CLI definitions, the interactive approval prompt,
//! console formatting and the JSONL session protocol.

pub mod approval;
pub mod cli;
pub mod output;
pub mod session;

// Re-export commonly used types
pub use approval::InteractiveApprover;
pub use cli::commands::{Cli, Command, OutputFormat, parse_call_arguments};
pub use output::console::ConsoleFormatter;
pub use session::{Inbound, Outbound, SessionRunner, SessionSummary};
