//! Built-in tool provider
//!
//! Wraps the local tool implementations (files, search, commands, code
//! intelligence, web, plan) as one [`ToolProvider`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use toolgate_application::{ExecutionContext, ToolProvider};
use toolgate_domain::{ToolCall, ToolDefinition, ToolError, ToolResult};

use crate::tools::{ToolEnv, builtin_tool_definitions, code, command, edit, file, plan, search};

pub const BUILTIN_PROVIDER_ID: &str = "builtin";

/// Built-in tool provider
#[derive(Clone)]
pub struct BuiltinProvider {
    env: ToolEnv,
    definitions: Vec<ToolDefinition>,
    index: HashMap<String, usize>,
    /// Tools that skip the approval gate even when dangerous
    auto_approve: HashSet<String>,
}

impl BuiltinProvider {
    pub fn new(env: ToolEnv) -> Self {
        let definitions = builtin_tool_definitions();
        let index = definitions
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self {
            env,
            definitions,
            index,
            auto_approve: HashSet::new(),
        }
    }

    pub fn with_auto_approve<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auto_approve.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn env(&self) -> &ToolEnv {
        &self.env
    }
}

#[async_trait]
impl ToolProvider for BuiltinProvider {
    fn id(&self) -> &str {
        BUILTIN_PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        "Built-in Tools"
    }

    fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }

    fn tool_definition(&self, name: &str) -> Option<ToolDefinition> {
        self.index.get(name).map(|i| self.definitions[*i].clone())
    }

    fn is_auto_approved(&self, name: &str) -> bool {
        self.auto_approve.contains(name)
    }

    async fn execute(&self, call: &ToolCall, ctx: &mut ExecutionContext) -> ToolResult {
        let env = &self.env;
        match call.tool_name.as_str() {
            file::READ_FILE => file::execute_read_file(env, call, ctx).await,
            file::READ_FILES => file::execute_read_files(env, call, ctx).await,
            file::WRITE_FILE => file::execute_write_file(env, call, ctx).await,
            file::LIST_DIRECTORY => file::execute_list_directory(env, call, ctx).await,
            file::CREATE_DIRECTORY => file::execute_create_directory(env, call, ctx).await,
            file::DELETE_FILE => file::execute_delete_file(env, call, ctx).await,
            edit::EDIT_FILE => edit::execute_edit_file(env, call, ctx).await,
            edit::REPLACE_LINES => edit::execute_replace_lines(env, call, ctx).await,
            search::GLOB_SEARCH => search::execute_glob_search(env, call, ctx).await,
            search::GREP_SEARCH => search::execute_grep_search(env, call, ctx).await,
            command::RUN_COMMAND => command::execute_run_command(env, call, ctx).await,
            code::FIND_DEFINITION => code::execute_find_definition(env, call, ctx).await,
            code::FIND_REFERENCES => code::execute_find_references(env, call, ctx).await,
            code::HOVER => code::execute_hover(env, call, ctx).await,
            code::DOCUMENT_SYMBOLS => code::execute_document_symbols(env, call, ctx).await,
            #[cfg(feature = "web-tools")]
            crate::tools::web::WEB_FETCH => {
                crate::tools::web::execute_web_fetch(env, call, ctx).await
            }
            plan::CREATE_PLAN => plan::execute_create_plan(env, call, ctx).await,
            plan::UPDATE_PLAN => plan::execute_update_plan(env, call, ctx).await,
            plan::GET_PLAN => plan::execute_get_plan(env, call, ctx).await,
            other => ToolResult::failure(other, ToolError::not_found(format!("tool '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{root, workspace};
    use toolgate_domain::{ApprovalType, ErrorKind};

    #[test]
    fn lists_every_builtin() {
        let provider = BuiltinProvider::new(ToolEnv::local());
        let names: Vec<_> = provider
            .tool_definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        for expected in [
            "read_file",
            "read_files",
            "write_file",
            "edit_file",
            "replace_lines",
            "list_directory",
            "create_directory",
            "delete_file",
            "glob_search",
            "grep_search",
            "run_command",
            "find_definition",
            "hover",
            "create_plan",
            "update_plan",
            "get_plan",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
            assert!(provider.has_tool(expected));
        }
        assert!(!provider.has_tool("unknown_tool"));
    }

    #[test]
    fn approval_requirements() {
        let provider = BuiltinProvider::new(ToolEnv::local()).with_auto_approve(["write_file"]);
        assert_eq!(provider.approval_type("read_file"), ApprovalType::None);
        assert_eq!(provider.approval_type("run_command"), ApprovalType::Dangerous);
        assert_eq!(provider.approval_type("edit_file"), ApprovalType::Dangerous);
        assert!(provider.is_auto_approved("write_file"));
        assert!(!provider.is_auto_approved("run_command"));
    }

    #[test]
    fn missing_required_argument_is_validation() {
        let provider = BuiltinProvider::new(ToolEnv::local());
        let err = provider
            .validate_args(&ToolCall::new("edit_file").with_arg("path", "a.txt"))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let (_dir, mut ctx) = workspace();
        std::fs::write(root(&ctx).join("notes.txt"), "test content\n").unwrap();

        let provider = BuiltinProvider::new(ToolEnv::local());
        let call = ToolCall::new("read_file").with_arg("path", "notes.txt");
        let result = provider.execute(&call, &mut ctx).await;
        assert!(result.is_success());
        assert!(result.output().contains("test content"));
        assert!(ctx.file_cache.contains(&root(&ctx).join("notes.txt")));

        let result = provider.execute(&ToolCall::new("nope"), &mut ctx).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
    }
}
