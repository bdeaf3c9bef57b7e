//! Load, validate, then write. Each function here runs against whatever
//! `PlanStore` it is handed and never commits; the caller owns the atomic
//! unit and discards it when an error comes back.

use crate::app::AppError;
use crate::consistency::{self, ConsistencyScope, ValidatedChanges};
use crate::domain::entity::{ProjectPlan, Row, Task};
use crate::domain::patch::{ProjectPlanPatchTemplate, RowPatchTemplate, TaskPatchTemplate};
use crate::domain::{PlanId, RowId, TaskId};
use crate::store::PlanStore;
use crate::structural::{self, StructuralError};

pub fn patch_row<S: PlanStore + ?Sized>(
    store: &S,
    row_id: RowId,
    patch: &RowPatchTemplate,
) -> Result<Row, AppError> {
    structural::check_row_patch(row_id, patch)?;
    let row = store.load_row(row_id)?;
    let changes = consistency::validate_row_patch(&row, patch).inspect_err(|err| {
        tracing::debug!(row_id, scope = err.scope.as_str(), error = %err, "row patch rejected");
    })?;

    if let Some(title) = patch.title.as_set() {
        let mut renamed = row.clone();
        renamed.title = title.clone();
        store.save_row(&renamed)?;
    }
    write_candidates(store, &changes)?;

    tracing::info!(
        row_id,
        tasks = changes.candidates().len(),
        "row patch applied"
    );
    Ok(store.load_row(row_id)?)
}

pub fn patch_project_plan<S: PlanStore + ?Sized>(
    store: &S,
    plan_id: PlanId,
    patch: &ProjectPlanPatchTemplate,
) -> Result<ProjectPlan, AppError> {
    structural::check_project_plan_patch(plan_id, patch)?;
    let plan = store.load_project_plan(plan_id)?;
    let changes = consistency::validate_project_plan_patch(&plan, patch).inspect_err(|err| {
        tracing::debug!(plan_id, scope = err.scope.as_str(), error = %err, "project plan patch rejected");
    })?;

    if let Some(title) = patch.title.as_set() {
        let mut renamed = plan.clone();
        renamed.title = title.clone();
        store.save_project_plan(&renamed)?;
    }
    write_candidates(store, &changes)?;

    tracing::info!(
        plan_id,
        rows = patch.row_patches().len(),
        tasks = changes.candidates().len(),
        "project plan patch applied"
    );
    Ok(store.load_project_plan(plan_id)?)
}

/// Patch one task. Staying in its row validates that row alone; moving to
/// another row validates the whole plan the task belongs to.
pub fn patch_task<S: PlanStore + ?Sized>(
    store: &S,
    task_id: TaskId,
    patch: &TaskPatchTemplate,
) -> Result<Task, AppError> {
    structural::check_task_patch(task_id, patch)?;
    let current = store.load_task(task_id)?;
    let home = store.load_row(current.row_id)?;

    let changes = match patch.row_id.as_set().copied() {
        Some(destination) if destination != current.row_id => {
            let plan = store.load_project_plan(home.project_plan_id)?;
            if plan.find_row(destination).is_none() {
                let foreign = store.load_row(destination)?;
                return Err(StructuralError::Invalid(format!(
                    "task {} cannot move to row {}: that row belongs to project plan {}, not {}",
                    task_id, destination, foreign.project_plan_id, plan.id
                ))
                .into());
            }
            consistency::validate_task_patch(&plan.row_list, patch, ConsistencyScope::ProjectPlan)
        }
        _ => consistency::validate_task_patch(
            std::slice::from_ref(&home),
            patch,
            ConsistencyScope::Row,
        ),
    }
    .inspect_err(|err| {
        tracing::debug!(task_id, scope = err.scope.as_str(), error = %err, "task patch rejected");
    })?;

    write_candidates(store, &changes)?;
    tracing::info!(task_id, "task patch applied");
    Ok(store.load_task(task_id)?)
}

/// Dry run of `patch_row`: same checks, no writes.
pub fn validate_row_patch<S: PlanStore + ?Sized>(
    store: &S,
    row_id: RowId,
    patch: &RowPatchTemplate,
) -> Result<ValidatedChanges, AppError> {
    structural::check_row_patch(row_id, patch)?;
    let row = store.load_row(row_id)?;
    Ok(consistency::validate_row_patch(&row, patch)?)
}

/// Writes follow patch order.
fn write_candidates<S: PlanStore + ?Sized>(
    store: &S,
    changes: &ValidatedChanges,
) -> Result<(), AppError> {
    for candidate in changes.candidates() {
        store.save_task(candidate)?;
    }
    Ok(())
}
