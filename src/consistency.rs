//! Slot-occupancy checks for proposed row and project plan patches.
//!
//! Validation is pure: it takes the persisted rows as loaded and the patch
//! templates, hydrates every template against the task it targets, and
//! checks that the resulting layout never has two tasks claiming the same
//! slot of the same row. Hydrated tasks are handed back so the caller can
//! persist exactly what was validated.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

use crate::domain::entity::{ProjectPlan, Row, Task};
use crate::domain::patch::{ProjectPlanPatchTemplate, RowPatchTemplate, TaskPatchTemplate};
use crate::domain::{RowId, TaskId};
use crate::hydrate::hydrate_task;

pub const OVERLAP_MESSAGE: &str =
    "The proposed change results in more than one task occupying the same space.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyScope {
    Row,
    ProjectPlan,
}

impl ConsistencyScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ConsistencyScope::Row => "row",
            ConsistencyScope::ProjectPlan => "project_plan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    UnknownTask(TaskId),
    UnknownRow(RowId),
    /// `first` and `second` are the lowest-id pair found overlapping in `row_id`.
    Overlap {
        row_id: RowId,
        first: TaskId,
        second: TaskId,
    },
}

impl Violation {
    pub fn is_unknown_reference(&self) -> bool {
        matches!(self, Violation::UnknownTask(_) | Violation::UnknownRow(_))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnknownTask(id) => write!(
                f,
                "The patch request refers to a task ID that does not exist: {}",
                id
            ),
            Violation::UnknownRow(id) => write!(
                f,
                "The patch request refers to a row ID outside the rows being patched: {}",
                id
            ),
            Violation::Overlap { .. } => f.write_str(OVERLAP_MESSAGE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyError {
    pub scope: ConsistencyScope,
    pub violation: Violation,
}

impl ConsistencyError {
    fn row(violation: Violation) -> Self {
        Self {
            scope: ConsistencyScope::Row,
            violation,
        }
    }

    /// Re-signal a failure at project plan scope, keeping the message intact.
    pub fn into_project_plan_scope(self) -> Self {
        Self {
            scope: ConsistencyScope::ProjectPlan,
            violation: self.violation,
        }
    }
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.violation)
    }
}

impl Error for ConsistencyError {}

/// Hydrated tasks in the order their templates appeared in the patch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedChanges {
    candidates: Vec<Task>,
}

impl ValidatedChanges {
    pub fn candidates(&self) -> &[Task] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_candidates(self) -> Vec<Task> {
        self.candidates
    }
}

/// Validate a row patch against the row's currently persisted tasks.
pub fn validate_row_patch(
    row: &Row,
    patch: &RowPatchTemplate,
) -> Result<ValidatedChanges, ConsistencyError> {
    validate_in_rows(std::slice::from_ref(row), patch.task_patches().iter())
}

/// Validate a project plan patch over the union of every row in the plan,
/// so moves see source and destination occupancy at once.
pub fn validate_project_plan_patch(
    plan: &ProjectPlan,
    patch: &ProjectPlanPatchTemplate,
) -> Result<ValidatedChanges, ConsistencyError> {
    if let Some(row_patch) = patch
        .row_patches()
        .iter()
        .find(|row_patch| plan.find_row(row_patch.id).is_none())
    {
        return Err(ConsistencyError {
            scope: ConsistencyScope::ProjectPlan,
            violation: Violation::UnknownRow(row_patch.id),
        });
    }

    validate_in_rows(&plan.row_list, patch.task_patches())
        .map_err(ConsistencyError::into_project_plan_scope)
}

/// Validate a single task patch. A task staying in its row is checked
/// against that row alone; a cross-row move is checked against every row of
/// the plan at project plan scope.
pub fn validate_task_patch(
    rows: &[Row],
    patch: &TaskPatchTemplate,
    scope: ConsistencyScope,
) -> Result<ValidatedChanges, ConsistencyError> {
    let result = validate_in_rows(rows, std::iter::once(patch));
    match scope {
        ConsistencyScope::Row => result,
        ConsistencyScope::ProjectPlan => result.map_err(ConsistencyError::into_project_plan_scope),
    }
}

fn validate_in_rows<'a>(
    rows: &[Row],
    patches: impl Iterator<Item = &'a TaskPatchTemplate>,
) -> Result<ValidatedChanges, ConsistencyError> {
    let originals: BTreeMap<TaskId, &Task> = rows
        .iter()
        .flat_map(|row| row.task_list.iter())
        .map(|task| (task.id, task))
        .collect();

    let mut combined: BTreeMap<TaskId, Task> = originals
        .iter()
        .map(|(id, task)| (*id, (*task).clone()))
        .collect();
    let mut candidates = Vec::new();
    for patch in patches {
        let original = originals
            .get(&patch.id)
            .ok_or_else(|| ConsistencyError::row(Violation::UnknownTask(patch.id)))?;
        let candidate = hydrate_task(original, patch);
        combined.insert(candidate.id, candidate.clone());
        candidates.push(candidate);
    }

    check_occupancy(rows, combined.values()).map_err(ConsistencyError::row)?;
    Ok(ValidatedChanges { candidates })
}

/// Each task appears exactly once in `tasks`, so a task can only collide
/// with other tasks, never with its own earlier placement.
fn check_occupancy<'a>(
    rows: &[Row],
    tasks: impl Iterator<Item = &'a Task>,
) -> Result<(), Violation> {
    let mut claims: BTreeMap<RowId, Vec<(i64, i64, TaskId)>> =
        rows.iter().map(|row| (row.id, Vec::new())).collect();

    for task in tasks {
        claims
            .get_mut(&task.row_id)
            .ok_or(Violation::UnknownRow(task.row_id))?
            .push((task.position, task.last_slot(), task.id));
    }

    // Ends are inclusive so a task sitting on `i64::MAX` still claims a slot.
    for (row_id, row_claims) in &mut claims {
        row_claims.sort_unstable();
        let mut furthest: Option<(i64, TaskId)> = None;
        for &(first_slot, last_slot, task_id) in row_claims.iter() {
            if let Some((occupied_through, holder)) = furthest {
                if first_slot <= occupied_through {
                    return Err(Violation::Overlap {
                        row_id: *row_id,
                        first: holder.min(task_id),
                        second: holder.max(task_id),
                    });
                }
            }
            if furthest.map_or(true, |(through, _)| last_slot > through) {
                furthest = Some((last_slot, task_id));
            }
        }
    }

    Ok(())
}
