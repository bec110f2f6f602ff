//! Plan tools: create_plan, update_plan, get_plan
//!
//! The active plan lives on the execution context and is mirrored to
//! `ToolEnv::plan_file` under the workspace root after every change, so a
//! later session can pick it up with `get_plan`.

use std::path::PathBuf;

use serde_json::Value;
use toolgate_application::ExecutionContext;
use toolgate_domain::plan::resolve_item_index;
use toolgate_domain::{
    ApprovalType, ErrorKind, Plan, PlanError, PlanItem, PlanItemStatus, PlanItemUpdate,
    PlanStatus, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
};
use tracing::{debug, info};

use super::{ToolEnv, cancellable, fs_error};

pub const CREATE_PLAN: &str = "create_plan";
pub const UPDATE_PLAN: &str = "update_plan";
pub const GET_PLAN: &str = "get_plan";

pub fn plan_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            CREATE_PLAN,
            "Create a step-by-step plan for the current task, replacing any existing plan",
            ApprovalType::None,
        )
        .with_parameter(ToolParameter::new("title", "Short title of the plan", true))
        .with_parameter(
            ToolParameter::new(
                "items",
                "Plan steps: strings, or objects with 'title' and optional 'description'",
                true,
            )
            .with_type("array"),
        ),
        ToolDefinition::new(
            UPDATE_PLAN,
            "Update one plan item (by id, id prefix, or 1-based number) or the plan status",
            ApprovalType::None,
        )
        .with_parameter(ToolParameter::new(
            "item",
            "Item id, unique id prefix, or 1-based item number",
            false,
        ))
        .with_parameter(ToolParameter::new(
            "status",
            "New item status: pending, in_progress, completed, failed, skipped",
            false,
        ))
        .with_parameter(ToolParameter::new("title", "New item title", false))
        .with_parameter(ToolParameter::new("description", "New item description", false))
        .with_parameter(ToolParameter::new(
            "plan_status",
            "New plan status: active, completed, abandoned",
            false,
        )),
        ToolDefinition::new(GET_PLAN, "Show the current plan", ApprovalType::None),
    ]
}

fn plan_error(err: PlanError) -> ToolError {
    match err {
        PlanError::NoPlan => ToolError::new(ErrorKind::NotFound, err.to_string()),
        other => ToolError::validation(other.to_string()),
    }
}

fn short_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

fn plan_path(env: &ToolEnv, ctx: &ExecutionContext) -> Result<PathBuf, ToolError> {
    env.resolve(ctx, &env.plan_file.to_string_lossy())
}

async fn persist(env: &ToolEnv, ctx: &ExecutionContext, plan: &Plan) -> Result<(), ToolError> {
    let path = plan_path(env, ctx)?;
    let json = serde_json::to_string_pretty(plan)
        .map_err(|e| ToolError::execution_failed(format!("failed to serialize plan: {}", e)))?;
    cancellable(ctx.cancellation(), env.fs.write(&path, &json, true))
        .await?
        .map_err(fs_error)?;
    debug!("Plan {} written to {}", plan.id, path.display());
    Ok(())
}

async fn load(env: &ToolEnv, ctx: &ExecutionContext) -> Result<Option<Plan>, ToolError> {
    let path = plan_path(env, ctx)?;
    let json = match cancellable(ctx.cancellation(), env.fs.read(&path, ctx.limits.max_read_bytes))
        .await?
    {
        Ok(json) => json,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(fs_error(e)),
    };
    serde_json::from_str(&json).map(Some).map_err(|e| {
        ToolError::validation(format!(
            "stored plan at {} is not valid: {}",
            path.display(),
            e
        ))
    })
}

fn parse_items(value: Option<&Value>) -> Result<Vec<PlanItem>, ToolError> {
    let Some(Value::Array(raw)) = value else {
        return Err(ToolError::validation(
            "items must be an array of strings or {title, description} objects",
        ));
    };
    let mut items = Vec::with_capacity(raw.len());
    for (idx, entry) in raw.iter().enumerate() {
        let item = match entry {
            Value::String(title) if !title.trim().is_empty() => {
                PlanItem::new(short_id(), title.trim())
            }
            Value::Object(obj) => {
                let title = obj
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        ToolError::validation(format!("item {} is missing a title", idx + 1))
                    })?;
                let item = PlanItem::new(short_id(), title);
                match obj.get("description").and_then(Value::as_str) {
                    Some(description) => item.with_description(description),
                    None => item,
                }
            }
            _ => {
                return Err(ToolError::validation(format!(
                    "item {} must be a non-empty string or an object with a title",
                    idx + 1
                )));
            }
        };
        items.push(item);
    }
    if items.is_empty() {
        return Err(plan_error(PlanError::EmptyPlan));
    }
    Ok(items)
}

pub async fn execute_create_plan(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let title = match call.require_string("title") {
        Ok(t) => t.trim(),
        Err(e) => return ToolResult::failure(CREATE_PLAN, ToolError::validation(e)),
    };
    let items = match parse_items(call.arguments.get("items")) {
        Ok(items) => items,
        Err(e) => return ToolResult::failure(CREATE_PLAN, e),
    };

    let plan = Plan::new(short_id(), title, items);
    if let Err(e) = persist(env, ctx, &plan).await {
        return ToolResult::failure(CREATE_PLAN, e);
    }
    info!("Created plan {} with {} items", plan.id, plan.items.len());

    let rendered = plan.render();
    let id = plan.id.clone();
    ctx.plan = Some(plan);
    ToolResult::success(CREATE_PLAN, rendered).with_extra("plan_id", id)
}

pub async fn execute_update_plan(
    env: &ToolEnv,
    call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    let mut plan = match ctx.plan.clone() {
        Some(plan) => plan,
        None => match load(env, ctx).await {
            Ok(Some(plan)) => plan,
            Ok(None) => return ToolResult::failure(UPDATE_PLAN, plan_error(PlanError::NoPlan)),
            Err(e) => return ToolResult::failure(UPDATE_PLAN, e),
        },
    };

    let status = match call.get_string("status") {
        Some(s) => match PlanItemStatus::parse(s) {
            Some(status) => Some(status),
            None => {
                return ToolResult::failure(
                    UPDATE_PLAN,
                    plan_error(PlanError::InvalidStatus(s.to_string())),
                );
            }
        },
        None => None,
    };
    let update = PlanItemUpdate {
        status,
        title: call.get_string("title").map(str::to_string),
        description: call.get_string("description").map(str::to_string),
    };
    let plan_status = match call.get_string("plan_status") {
        Some(s) => match PlanStatus::parse(s) {
            Some(status) => Some(status),
            None => {
                return ToolResult::failure(
                    UPDATE_PLAN,
                    ToolError::validation(format!(
                        "invalid plan_status '{}' (expected active, completed or abandoned)",
                        s
                    )),
                );
            }
        },
        None => None,
    };

    let mut changed = None;
    match call.get_string("item") {
        Some(reference) => {
            let index = match resolve_item_index(&plan, reference) {
                Ok(idx) => idx,
                Err(e) => return ToolResult::failure(UPDATE_PLAN, plan_error(e)),
            };
            if update.is_empty() && plan_status.is_none() {
                return ToolResult::failure(
                    UPDATE_PLAN,
                    ToolError::validation("nothing to update: pass status, title or description"),
                );
            }
            if !update.is_empty() {
                changed = plan.apply_update(index, &update).map(|i| i.id.clone());
            }
        }
        None if !update.is_empty() => {
            return ToolResult::failure(
                UPDATE_PLAN,
                ToolError::validation(
                    "item is required when changing status, title or description",
                ),
            );
        }
        None if plan_status.is_none() => {
            return ToolResult::failure(
                UPDATE_PLAN,
                ToolError::validation("nothing to update: pass item with changes, or plan_status"),
            );
        }
        None => {}
    }
    if let Some(status) = plan_status {
        plan.set_status(status);
    }

    if let Err(e) = persist(env, ctx, &plan).await {
        return ToolResult::failure(UPDATE_PLAN, e);
    }
    if let Some(id) = &changed {
        info!("Updated plan item {}", id);
    }

    let rendered = plan.render();
    ctx.plan = Some(plan);
    let result = ToolResult::success(UPDATE_PLAN, rendered);
    match changed {
        Some(id) => result.with_extra("item_id", id),
        None => result,
    }
}

pub async fn execute_get_plan(
    env: &ToolEnv,
    _call: &ToolCall,
    ctx: &mut ExecutionContext,
) -> ToolResult {
    if let Some(plan) = &ctx.plan {
        return ToolResult::success(GET_PLAN, plan.render());
    }
    match load(env, ctx).await {
        Ok(Some(plan)) => {
            let rendered = plan.render();
            ctx.plan = Some(plan);
            ToolResult::success(GET_PLAN, rendered)
        }
        Ok(None) => ToolResult::failure(GET_PLAN, plan_error(PlanError::NoPlan)),
        Err(e) => ToolResult::failure(GET_PLAN, e),
    }
}
