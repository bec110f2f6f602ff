//! Rich content: classification of external tool output.

pub mod classifier;
pub mod language;
pub mod rich_content;

pub use classifier::{
    ClassificationRule, TEXT_RULES, classify_binary, classify_resource, classify_text,
    matching_rule,
};
pub use language::{PLAINTEXT, detect_language};
pub use rich_content::{ContentKind, RichContentItem};
