//! Configuration file loading for toolgate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment: `TOOLGATE_*`, nested with `__` (`TOOLGATE_LIMITS__READ_CONCURRENCY=3`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolgate.toml` or `./.toolgate.toml`
//! 4. Global: `$XDG_CONFIG_HOME/toolgate/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ApprovalMode, ConfigValidationError, FileApprovalConfig, FileConfig, FileLimitsConfig,
    FileLoggingConfig, FileMcpConfig, FileMcpServerConfig, FileWorkspaceConfig,
};
pub use loader::{ConfigLoader, ConfigSource, ENV_PREFIX};
