use std::collections::HashSet;
use std::error::Error;
use std::fmt;

use crate::domain::entity::{NewRow, NewTask, Row};
use crate::domain::patch::{Field, ProjectPlanPatchTemplate, RowPatchTemplate, TaskPatchTemplate};
use crate::domain::{Entity, PlanId, RowId, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    Invalid(String),
    MismatchedIds {
        entity: Entity,
        expected: i64,
        found: i64,
    },
}

impl StructuralError {
    fn invalid(message: impl Into<String>) -> Self {
        StructuralError::Invalid(message.into())
    }
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralError::Invalid(message) => write!(f, "{}", message),
            StructuralError::MismatchedIds {
                entity,
                expected,
                found,
            } => write!(
                f,
                "the {} id in the request body ({}) does not match the requested id ({})",
                entity, found, expected
            ),
        }
    }
}

impl Error for StructuralError {}

pub fn check_new_task(task: &NewTask) -> Result<(), StructuralError> {
    if task.id.is_some() {
        return Err(StructuralError::invalid(
            "cannot specify an id on a new task; ids are assigned by storage",
        ));
    }
    if task.row_id.is_none() {
        return Err(StructuralError::invalid("a new task requires a rowId"));
    }
    if task.title.is_none() {
        return Err(StructuralError::invalid(
            "a new task requires a title; an empty string is allowed",
        ));
    }
    let Some(size) = task.size else {
        return Err(StructuralError::invalid("a new task requires a size"));
    };
    check_size(size)?;
    let Some(position) = task.position else {
        return Err(StructuralError::invalid("a new task requires a position"));
    };
    check_position(position)?;
    check_span(size, position)
}

pub fn check_new_row(row: &NewRow) -> Result<(), StructuralError> {
    if row.id.is_some() {
        return Err(StructuralError::invalid(
            "cannot specify an id on a new row; ids are assigned by storage",
        ));
    }
    if row.task_list.as_ref().is_some_and(|tasks| !tasks.is_empty()) {
        return Err(StructuralError::invalid(
            "a new row cannot be saved with tasks; save the row first, then create tasks that reference its id",
        ));
    }
    Ok(())
}

pub fn check_row_delete(row: &Row) -> Result<(), StructuralError> {
    if !row.task_list.is_empty() {
        return Err(StructuralError::invalid(format!(
            "cannot delete row {} while it still has {} task(s); delete or move them first",
            row.id,
            row.task_list.len()
        )));
    }
    Ok(())
}

pub fn check_task_patch(task_id: TaskId, patch: &TaskPatchTemplate) -> Result<(), StructuralError> {
    check_ids(Entity::Task, task_id, patch.id)?;
    check_task_fields(patch)
}

pub fn check_row_patch(row_id: RowId, patch: &RowPatchTemplate) -> Result<(), StructuralError> {
    check_ids(Entity::Row, row_id, patch.id)?;
    check_unique_tasks(patch.task_patches().iter())?;
    for task in patch.task_patches() {
        check_task_in_row(task, patch.id)?;
        check_task_fields(task)?;
    }
    Ok(())
}

pub fn check_project_plan_patch(
    plan_id: PlanId,
    patch: &ProjectPlanPatchTemplate,
) -> Result<(), StructuralError> {
    check_ids(Entity::ProjectPlan, plan_id, patch.id)?;

    if patch.title.is_unchanged() && patch.row_patches().is_empty() {
        return Err(StructuralError::invalid(
            "a project plan patch must specify a title, rows, or both",
        ));
    }

    for row in patch.row_patches() {
        if row.task_patches().is_empty() {
            return Err(StructuralError::invalid(format!(
                "row {} is in the project plan patch but has no tasks to update",
                row.id
            )));
        }
        for task in row.task_patches() {
            if task.size.is_set() {
                return Err(StructuralError::invalid(
                    "size cannot be changed by a project plan patch; use a row patch to resize a task",
                ));
            }
            check_task_in_row(task, row.id)?;
            check_task_fields(task)?;
        }
    }
    check_unique_tasks(patch.task_patches())
}

fn check_ids(entity: Entity, expected: i64, found: i64) -> Result<(), StructuralError> {
    if expected != found {
        return Err(StructuralError::MismatchedIds {
            entity,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_task_in_row(task: &TaskPatchTemplate, row_id: RowId) -> Result<(), StructuralError> {
    match task.row_id {
        Field::Set(task_row) if task_row != row_id => Err(StructuralError::invalid(format!(
            "task {} has rowId {} but is listed under row {}",
            task.id, task_row, row_id
        ))),
        _ => Ok(()),
    }
}

fn check_task_fields(task: &TaskPatchTemplate) -> Result<(), StructuralError> {
    if let Field::Set(size) = task.size {
        check_size(size)?;
    }
    if let Field::Set(position) = task.position {
        check_position(position)?;
    }
    if let (Field::Set(size), Field::Set(position)) = (&task.size, &task.position) {
        check_span(*size, *position)?;
    }
    Ok(())
}

fn check_unique_tasks<'a>(
    tasks: impl Iterator<Item = &'a TaskPatchTemplate>,
) -> Result<(), StructuralError> {
    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(StructuralError::invalid(format!(
                "task {} appears more than once in the patch",
                task.id
            )));
        }
    }
    Ok(())
}

fn check_size(size: i64) -> Result<(), StructuralError> {
    if size < 1 {
        return Err(StructuralError::invalid(format!(
            "task size must be a positive integer, got {}",
            size
        )));
    }
    Ok(())
}

fn check_position(position: i64) -> Result<(), StructuralError> {
    if position < 0 {
        return Err(StructuralError::invalid(format!(
            "task position cannot be negative, got {}",
            position
        )));
    }
    Ok(())
}

/// The last slot, `position + size - 1`, must be representable.
fn check_span(size: i64, position: i64) -> Result<(), StructuralError> {
    if position.checked_add(size - 1).is_none() {
        return Err(StructuralError::invalid(format!(
            "a task of size {} at position {} runs past the last slot",
            size, position
        )));
    }
    Ok(())
}
