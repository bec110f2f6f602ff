//! Plan entities: a task checklist the model keeps while working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a single plan item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl PlanItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanItemStatus::Pending => "pending",
            PlanItemStatus::InProgress => "in_progress",
            PlanItemStatus::Completed => "completed",
            PlanItemStatus::Failed => "failed",
            PlanItemStatus::Skipped => "skipped",
        }
    }

    /// Lenient parse: accepts `in-progress`, `in progress`, `done`, any case
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "pending" | "todo" => Some(PlanItemStatus::Pending),
            "in_progress" | "active" | "started" => Some(PlanItemStatus::InProgress),
            "completed" | "complete" | "done" => Some(PlanItemStatus::Completed),
            "failed" | "error" => Some(PlanItemStatus::Failed),
            "skipped" | "skip" => Some(PlanItemStatus::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlanItemStatus::Completed | PlanItemStatus::Failed | PlanItemStatus::Skipped
        )
    }

    fn marker(&self) -> &'static str {
        match self {
            PlanItemStatus::Pending => "[ ]",
            PlanItemStatus::InProgress => "[~]",
            PlanItemStatus::Completed => "[x]",
            PlanItemStatus::Failed => "[!]",
            PlanItemStatus::Skipped => "[-]",
        }
    }
}

impl std::fmt::Display for PlanItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Active,
    Completed,
    Abandoned,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(PlanStatus::Active),
            "completed" | "complete" | "done" => Some(PlanStatus::Completed),
            "abandoned" | "cancelled" | "canceled" => Some(PlanStatus::Abandoned),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: PlanItemStatus,
}

impl PlanItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: PlanItemStatus::Pending,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update of a plan item; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanItemUpdate {
    pub status: Option<PlanItemStatus>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PlanItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.title.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub title: String,
    pub items: Vec<PlanItem>,
    #[serde(default)]
    pub status: PlanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(id: impl Into<String>, title: impl Into<String>, items: Vec<PlanItem>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            items,
            status: PlanStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply `update` to the item at `index` and touch `updated_at`.
    ///
    /// Once every item is terminal an active plan becomes completed.
    pub fn apply_update(&mut self, index: usize, update: &PlanItemUpdate) -> Option<&PlanItem> {
        let item = self.items.get_mut(index)?;
        if let Some(status) = update.status {
            item.status = status;
        }
        if let Some(title) = &update.title {
            item.title = title.clone();
        }
        if let Some(description) = &update.description {
            item.description = description.clone();
        }
        self.updated_at = Utc::now();
        self.refresh_status();
        self.items.get(index)
    }

    pub fn set_status(&mut self, status: PlanStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    fn refresh_status(&mut self) {
        if self.status == PlanStatus::Active
            && !self.items.is_empty()
            && self.items.iter().all(|i| i.status.is_terminal())
        {
            self.status = PlanStatus::Completed;
        }
    }

    /// (terminal items, total items)
    pub fn progress(&self) -> (usize, usize) {
        let done = self.items.iter().filter(|i| i.status.is_terminal()).count();
        (done, self.items.len())
    }

    /// Checklist rendering for the model
    pub fn render(&self) -> String {
        let (done, total) = self.progress();
        let mut out = format!(
            "Plan: {} ({}, {}/{} done)\n",
            self.title, self.status, done, total
        );
        for (idx, item) in self.items.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} {} (id: {})\n",
                idx + 1,
                item.status.marker(),
                item.title,
                item.id
            ));
            if !item.description.is_empty() {
                out.push_str(&format!("     {}\n", item.description));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::new(
            "plan-1",
            "Refactor parser",
            vec![
                PlanItem::new("abc1", "Read the code"),
                PlanItem::new("def2", "Write tests").with_description("cover edge cases"),
            ],
        )
    }

    #[test]
    fn status_parse_is_lenient() {
        assert_eq!(PlanItemStatus::parse("In-Progress"), Some(PlanItemStatus::InProgress));
        assert_eq!(PlanItemStatus::parse("done"), Some(PlanItemStatus::Completed));
        assert_eq!(PlanItemStatus::parse("bogus"), None);
        assert_eq!(PlanStatus::parse("cancelled"), Some(PlanStatus::Abandoned));
    }

    #[test]
    fn partial_update_touches_only_given_fields() {
        let mut plan = plan();
        let before = plan.updated_at;
        let update = PlanItemUpdate {
            status: Some(PlanItemStatus::InProgress),
            ..Default::default()
        };
        let item = plan.apply_update(1, &update).unwrap().clone();
        assert_eq!(item.status, PlanItemStatus::InProgress);
        assert_eq!(item.title, "Write tests");
        assert_eq!(item.description, "cover edge cases");
        assert!(plan.updated_at >= before);
        assert_eq!(plan.status, PlanStatus::Active);
    }

    #[test]
    fn all_terminal_completes_plan() {
        let mut plan = plan();
        let done = PlanItemUpdate {
            status: Some(PlanItemStatus::Completed),
            ..Default::default()
        };
        plan.apply_update(0, &done);
        plan.apply_update(1, &PlanItemUpdate {
            status: Some(PlanItemStatus::Skipped),
            ..Default::default()
        });
        assert_eq!(plan.status, PlanStatus::Completed);
        assert_eq!(plan.progress(), (2, 2));
    }

    #[test]
    fn out_of_range_update_is_none() {
        let mut plan = plan();
        assert!(plan.apply_update(5, &PlanItemUpdate::default()).is_none());
    }

    #[test]
    fn render_lists_items() {
        let rendered = plan().render();
        assert!(rendered.starts_with("Plan: Refactor parser (active, 0/2 done)"));
        assert!(rendered.contains("1. [ ] Read the code (id: abc1)"));
        assert!(rendered.contains("cover edge cases"));
    }

    #[test]
    fn serde_round_trip_uses_snake_case() {
        let json = serde_json::to_value(plan()).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["items"][0]["status"], "pending");
    }
}
