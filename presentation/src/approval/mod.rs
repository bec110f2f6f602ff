//! Terminal approval prompt

mod interactive;

pub use interactive::{Answer, InteractiveApprover, parse_answer};
