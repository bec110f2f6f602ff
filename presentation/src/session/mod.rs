//! JSONL session protocol over stdin/stdout

mod protocol;
mod runner;

pub use protocol::{Inbound, Outbound};
pub use runner::{SessionRunner, SessionSummary};
