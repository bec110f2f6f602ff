//! Tool Registry
//!
//! The [`ToolRegistry`] aggregates tool providers and implements
//! [`ToolRegistryPort`]. Providers are consulted in registration order and
//! the first one whose `has_tool` matches owns the call.
//!
//! # Usage
//!
//! ```ignore
//! use toolgate_infrastructure::tools::{BuiltinProvider, ToolEnv, ToolRegistry};
//!
//! let registry = ToolRegistry::new()
//!     .register(BuiltinProvider::new(ToolEnv::local()))
//!     .register_arc(mcp_provider);
//!
//! assert!(registry.has_tool("read_file"));
//! let provider = registry.resolve("grep_search");
//! ```
//!
//! Provider catalogs are read live on every lookup, so tools from external
//! servers appear and disappear as those servers connect and drop.

use std::collections::HashSet;
use std::sync::Arc;

use toolgate_application::{ToolProvider, ToolRegistryPort};
use toolgate_domain::ToolDefinition;
use tracing::{debug, trace};

/// Tool registry that aggregates multiple providers
#[derive(Default)]
pub struct ToolRegistry {
    providers: Vec<Arc<dyn ToolProvider>>,
}

/// Per-provider tool counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub total_tools: usize,
    /// (provider id, tools it owns)
    pub providers: Vec<(String, usize)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool provider
    pub fn register<P: ToolProvider + 'static>(self, provider: P) -> Self {
        self.register_arc(Arc::new(provider))
    }

    /// Register a tool provider (Arc version)
    pub fn register_arc(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        debug!(provider = provider.id(), "Registered tool provider");
        self.providers.push(provider);
        self
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let mut seen = HashSet::new();
        let mut providers = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let owned = provider
                .tool_definitions()
                .into_iter()
                .filter(|d| seen.insert(d.name.clone()))
                .count();
            providers.push((provider.id().to_string(), owned));
        }
        RegistryStats {
            total_tools: seen.len(),
            providers,
        }
    }
}

impl ToolRegistryPort for ToolRegistry {
    /// Every tool once, earlier providers shadowing later ones
    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut seen = HashSet::new();
        let mut definitions = Vec::new();
        for provider in &self.providers {
            for definition in provider.tool_definitions() {
                if seen.insert(definition.name.clone()) {
                    definitions.push(definition);
                } else {
                    trace!(
                        tool = %definition.name,
                        provider = provider.id(),
                        "Tool already registered by an earlier provider"
                    );
                }
            }
        }
        definitions
    }

    fn resolve(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
        self.providers.iter().find(|p| p.has_tool(name)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use toolgate_application::{ExecutionContext, ResourceLimits};
    use toolgate_domain::{ApprovalType, ToolCall, ToolResult};

    struct Fixed {
        id: &'static str,
        tools: &'static [&'static str],
    }

    #[async_trait]
    impl ToolProvider for Fixed {
        fn id(&self) -> &str {
            self.id
        }

        fn display_name(&self) -> &str {
            self.id
        }

        fn has_tool(&self, name: &str) -> bool {
            self.tools.contains(&name)
        }

        fn tool_definitions(&self) -> Vec<ToolDefinition> {
            self.tools
                .iter()
                .map(|t| ToolDefinition::new(*t, self.id, ApprovalType::None))
                .collect()
        }

        fn is_auto_approved(&self, _name: &str) -> bool {
            false
        }

        async fn execute(&self, call: &ToolCall, _ctx: &mut ExecutionContext) -> ToolResult {
            ToolResult::success(&call.tool_name, self.id)
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .register(Fixed {
                id: "first",
                tools: &["read_file", "grep_search"],
            })
            .register(Fixed {
                id: "second",
                tools: &["grep_search", "mcp__git__status"],
            })
    }

    #[tokio::test]
    async fn first_registered_provider_wins() {
        let registry = registry();
        let provider = registry.resolve("grep_search").unwrap();
        assert_eq!(provider.id(), "first");

        let mut ctx = ExecutionContext::new(None, ResourceLimits::default());
        let result = provider
            .execute(&ToolCall::new("grep_search"), &mut ctx)
            .await;
        assert_eq!(result.output(), "first");

        assert_eq!(registry.resolve("mcp__git__status").unwrap().id(), "second");
        assert!(registry.resolve("missing").is_none());
        assert!(!registry.has_tool("missing"));
    }

    #[test]
    fn definitions_are_deduplicated_in_order() {
        let registry = registry();
        let defs = registry.tool_definitions();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["read_file", "grep_search", "mcp__git__status"]);
        assert_eq!(defs[1].description, "first");
    }

    #[test]
    fn stats_count_owned_tools() {
        let stats = registry().stats();
        assert_eq!(stats.total_tools, 3);
        assert_eq!(
            stats.providers,
            vec![("first".to_string(), 2), ("second".to_string(), 1)]
        );
        assert_eq!(registry().provider_ids(), ["first", "second"]);
    }
}
