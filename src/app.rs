use std::error::Error;
use std::fmt;

use rusqlite::Connection;
use serde::Serialize;

use crate::config::ConfigError;
use crate::consistency::ConsistencyError;
use crate::db::{self, InsertTask};
use crate::domain::entity::{NewRow, NewTask, ProjectPlan, Row, Task};
use crate::domain::patch::{ProjectPlanPatchTemplate, RowPatchTemplate, TaskPatchTemplate};
use crate::domain::{Entity, PlanId, RowId, TaskId};
use crate::orchestrate;
use crate::store::{PlanStore, SqliteStore, StoreError};
use crate::structural::{self, StructuralError};

pub struct App {
    conn: Connection,
}

/// Outcome of a dry-run row patch: what would be written.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RowCheckView {
    pub row_id: RowId,
    pub valid: bool,
    pub candidates: Vec<Task>,
}

impl App {
    pub fn open(db_path: &str) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        Ok(Self { conn })
    }

    pub fn create_project_plan(&mut self, title: &str) -> Result<ProjectPlan, AppError> {
        self.in_transaction("create_project_plan", |store| {
            Ok(store.create_project_plan(title)?)
        })
    }

    pub fn create_row(&mut self, row: &NewRow) -> Result<Row, AppError> {
        structural::check_new_row(row)?;
        self.in_transaction("create_row", |store| {
            Ok(store.create_row(row.project_plan_id, &row.title)?)
        })
    }

    pub fn create_task(&mut self, task: &NewTask) -> Result<Task, AppError> {
        structural::check_new_task(task)?;
        let (Some(row_id), Some(title), Some(size), Some(position)) =
            (task.row_id, task.title.as_deref(), task.size, task.position)
        else {
            return Err(AppError::Structural("a new task is incomplete".to_string()));
        };
        self.in_transaction("create_task", |store| {
            Ok(store.create_task(&InsertTask {
                row_id,
                title,
                size,
                position,
            })?)
        })
    }

    pub fn get_project_plan(&self, id: PlanId) -> Result<ProjectPlan, AppError> {
        Ok(self.store().load_project_plan(id)?)
    }

    pub fn get_row(&self, id: RowId) -> Result<Row, AppError> {
        Ok(self.store().load_row(id)?)
    }

    pub fn get_task(&self, id: TaskId) -> Result<Task, AppError> {
        Ok(self.store().load_task(id)?)
    }

    pub fn list_rows(&self, plan_id: PlanId) -> Result<Vec<Row>, AppError> {
        Ok(self.store().load_project_plan(plan_id)?.row_list)
    }

    pub fn list_tasks(&self, row_id: RowId) -> Result<Vec<Task>, AppError> {
        Ok(self.store().load_row(row_id)?.task_list)
    }

    pub fn delete_row(&mut self, id: RowId) -> Result<Row, AppError> {
        self.in_transaction("delete_row", |store| {
            let row = store.load_row(id)?;
            structural::check_row_delete(&row)?;
            store.delete_row(id)?;
            Ok(row)
        })
    }

    pub fn delete_task(&mut self, row_id: RowId, task_id: TaskId) -> Result<Task, AppError> {
        self.in_transaction("delete_task", |store| {
            let task = store.load_task(task_id)?;
            if task.row_id != row_id {
                return Err(AppError::MismatchedIds {
                    entity: Entity::Row,
                    expected: row_id,
                    found: task.row_id,
                });
            }
            store.delete_task(task_id)?;
            Ok(task)
        })
    }

    pub fn patch_row(&mut self, row_id: RowId, patch: &RowPatchTemplate) -> Result<Row, AppError> {
        self.in_transaction("patch_row", |store| {
            orchestrate::patch_row(store, row_id, patch)
        })
    }

    pub fn patch_project_plan(
        &mut self,
        plan_id: PlanId,
        patch: &ProjectPlanPatchTemplate,
    ) -> Result<ProjectPlan, AppError> {
        self.in_transaction("patch_project_plan", |store| {
            orchestrate::patch_project_plan(store, plan_id, patch)
        })
    }

    pub fn patch_task(
        &mut self,
        task_id: TaskId,
        patch: &TaskPatchTemplate,
    ) -> Result<Task, AppError> {
        self.in_transaction("patch_task", |store| {
            orchestrate::patch_task(store, task_id, patch)
        })
    }

    pub fn check_row_patch(
        &self,
        row_id: RowId,
        patch: &RowPatchTemplate,
    ) -> Result<RowCheckView, AppError> {
        let changes = orchestrate::validate_row_patch(&self.store(), row_id, patch)?;
        Ok(RowCheckView {
            row_id,
            valid: true,
            candidates: changes.into_candidates(),
        })
    }

    fn store(&self) -> SqliteStore<'_> {
        SqliteStore::new(&self.conn)
    }

    /// Commit when `operation` succeeds; roll back otherwise.
    fn in_transaction<T>(
        &mut self,
        operation: &'static str,
        body: impl FnOnce(&SqliteStore<'_>) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let tx = self.conn.transaction()?;
        let result = body(&SqliteStore::new(&tx));
        match result {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(err) => {
                if err.kind() == ErrorKind::Internal {
                    tracing::warn!(operation, error = %err, "rolling back transaction");
                } else {
                    tracing::debug!(operation, error = %err, "rolling back transaction");
                }
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(operation, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    UnknownReference,
    ConsistencyViolation,
    StructuralInvalid,
    MismatchedIds,
    Internal,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::NotFound => 3,
            ErrorKind::UnknownReference => 4,
            ErrorKind::ConsistencyViolation => 5,
            ErrorKind::StructuralInvalid | ErrorKind::MismatchedIds => 2,
            ErrorKind::Internal => 1,
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Config(ConfigError),
    Json(serde_json::Error),
    NotFound {
        entity: Entity,
        id: i64,
    },
    MismatchedIds {
        entity: Entity,
        expected: i64,
        found: i64,
    },
    Structural(String),
    Consistency(ConsistencyError),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::MismatchedIds { .. } => ErrorKind::MismatchedIds,
            AppError::Structural(_) | AppError::Json(_) => ErrorKind::StructuralInvalid,
            AppError::Consistency(err) if err.violation.is_unknown_reference() => {
                ErrorKind::UnknownReference
            }
            AppError::Consistency(_) => ErrorKind::ConsistencyViolation,
            AppError::Io(_) | AppError::Db(_) | AppError::Config(_) => ErrorKind::Internal,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Db(err) => write!(f, "database error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Json(err) => write!(f, "invalid request body: {}", err),
            AppError::NotFound { entity, id } => write!(f, "{} {} does not exist", entity, id),
            AppError::MismatchedIds {
                entity,
                expected,
                found,
            } => write!(
                f,
                "{} id mismatch: expected {}, found {}",
                entity, expected, found
            ),
            AppError::Structural(message) => write!(f, "{}", message),
            AppError::Consistency(err) => write!(f, "{}", err),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Consistency(err) => Some(err),
            AppError::NotFound { .. } | AppError::MismatchedIds { .. } | AppError::Structural(_) => {
                None
            }
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Json(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, id } => AppError::NotFound { entity, id },
            StoreError::Db(err) => AppError::Db(err),
        }
    }
}

impl From<StructuralError> for AppError {
    fn from(value: StructuralError) -> Self {
        match value {
            StructuralError::Invalid(message) => AppError::Structural(message),
            StructuralError::MismatchedIds {
                entity,
                expected,
                found,
            } => AppError::MismatchedIds {
                entity,
                expected,
                found,
            },
        }
    }
}

impl From<ConsistencyError> for AppError {
    fn from(value: ConsistencyError) -> Self {
        AppError::Consistency(value)
    }
}

#[cfg(test)]
mod tests;
