//! Plan management domain.

pub mod entities;
pub mod resolve;

pub use entities::{Plan, PlanItem, PlanItemStatus, PlanItemUpdate, PlanStatus};
pub use resolve::{MIN_PREFIX_LEN, PlanError, resolve_item_index};
