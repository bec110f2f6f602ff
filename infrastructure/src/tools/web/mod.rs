//! Web tools, gated behind the `web-tools` Cargo feature
//!
//! | Tool | Description | Key Dependency |
//! |------|-------------|----------------|
//! | `web_fetch` | Fetch a URL, extract readable text from HTML | `reqwest` + `scraper` |
//!
//! ```toml
//! # infrastructure/Cargo.toml
//! [features]
//! web-tools = ["dep:reqwest", "dep:scraper"]
//!
//! # cli/Cargo.toml (enabled by default for end users)
//! [features]
//! default = ["web-tools"]
//! web-tools = ["toolgate-infrastructure/web-tools"]
//! ```

mod fetch;

pub use fetch::{WEB_FETCH, execute_web_fetch, html_to_text, web_fetch_definition};
