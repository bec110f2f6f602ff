//! Resolution of the loose item references models send (`"abc"`, `"2"`).

use thiserror::Error;

use super::entities::Plan;

/// Shortest id prefix accepted as a reference.
///
/// Three, not four: models routinely quote the first three characters of an
/// id (`"abc"` for `abc1`), and that must resolve. Two characters would
/// collide with numeric positions such as `"12"`.
pub const MIN_PREFIX_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no active plan; call create_plan first")]
    NoPlan,

    #[error("a plan needs at least one item")]
    EmptyPlan,

    #[error("plan item reference must not be empty")]
    EmptyReference,

    #[error("no plan item matches '{reference}' (items: {known})")]
    ItemNotFound { reference: String, known: String },

    #[error("'{reference}' is ambiguous, it prefixes: {}", .candidates.join(", "))]
    AmbiguousPrefix {
        reference: String,
        candidates: Vec<String>,
    },

    #[error(
        "invalid status '{0}' (expected pending, in_progress, completed, failed or skipped)"
    )]
    InvalidStatus(String),
}

/// Index of the item `reference` points at.
///
/// Tried in order: exact id, unique id prefix of at least
/// [`MIN_PREFIX_LEN`] characters, then a number read as a 1-based position
/// (0 falls back to the first item as a 0-based index).
pub fn resolve_item_index(plan: &Plan, reference: &str) -> Result<usize, PlanError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(PlanError::EmptyReference);
    }

    if let Some(idx) = plan.items.iter().position(|i| i.id == reference) {
        return Ok(idx);
    }

    if reference.chars().count() >= MIN_PREFIX_LEN {
        let candidates: Vec<usize> = plan
            .items
            .iter()
            .enumerate()
            .filter(|(_, i)| i.id.starts_with(reference))
            .map(|(idx, _)| idx)
            .collect();
        match candidates.as_slice() {
            [only] => return Ok(*only),
            [] => {}
            many => {
                return Err(PlanError::AmbiguousPrefix {
                    reference: reference.to_string(),
                    candidates: many.iter().map(|i| plan.items[*i].id.clone()).collect(),
                });
            }
        }
    }

    if let Ok(n) = reference.trim_start_matches('#').parse::<usize>() {
        let len = plan.items.len();
        if (1..=len).contains(&n) {
            return Ok(n - 1);
        }
        if n < len {
            return Ok(n);
        }
    }

    Err(PlanError::ItemNotFound {
        reference: reference.to_string(),
        known: plan
            .items
            .iter()
            .enumerate()
            .map(|(idx, i)| format!("{}={}", idx + 1, i.id))
            .collect::<Vec<_>>()
            .join(", "),
    })
}
