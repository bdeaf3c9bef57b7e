use std::error::Error;
use std::fmt;

use rusqlite::Connection;

use crate::db::{self, InsertTask, RowRecord};
use crate::domain::entity::{ProjectPlan, Row, Task};
use crate::domain::{Entity, PlanId, RowId, TaskId};

#[derive(Debug)]
pub enum StoreError {
    NotFound { entity: Entity, id: i64 },
    Db(rusqlite::Error),
}

impl StoreError {
    fn not_found(entity: Entity, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { entity, id } => write!(f, "{} {} does not exist", entity, id),
            StoreError::Db(err) => write!(f, "database error: {}", err),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::NotFound { .. } => None,
            StoreError::Db(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        StoreError::Db(value)
    }
}

/// Loads and persists the plan graph. Every call made during one patch
/// operation must land in the same atomic unit; the implementation does not
/// commit on its own.
pub trait PlanStore {
    /// Rows eagerly loaded, each with its tasks ordered by id.
    fn load_project_plan(&self, id: PlanId) -> Result<ProjectPlan, StoreError>;
    fn load_row(&self, id: RowId) -> Result<Row, StoreError>;
    fn load_task(&self, id: TaskId) -> Result<Task, StoreError>;

    fn create_project_plan(&self, title: &str) -> Result<ProjectPlan, StoreError>;
    fn create_row(&self, project_plan_id: PlanId, title: &str) -> Result<Row, StoreError>;
    fn create_task(&self, task: &InsertTask<'_>) -> Result<Task, StoreError>;

    /// Overwrite the stored task with the same id.
    fn save_task(&self, task: &Task) -> Result<Task, StoreError>;
    /// Persist the row's own fields; its task list is ignored.
    fn save_row(&self, row: &Row) -> Result<(), StoreError>;
    /// Persist the plan's own fields; its row list is ignored.
    fn save_project_plan(&self, plan: &ProjectPlan) -> Result<(), StoreError>;

    fn delete_row(&self, id: RowId) -> Result<(), StoreError>;
    fn delete_task(&self, id: TaskId) -> Result<(), StoreError>;
}

/// `PlanStore` over a borrowed connection. Handing it a
/// `rusqlite::Transaction` scopes every write to that transaction.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn assemble_row(&self, record: RowRecord) -> Result<Row, StoreError> {
        let task_list = db::list_tasks_for_row(self.conn, record.id)?;
        Ok(Row {
            id: record.id,
            project_plan_id: record.project_plan_id,
            title: record.title,
            task_list,
        })
    }
}

impl PlanStore for SqliteStore<'_> {
    fn load_project_plan(&self, id: PlanId) -> Result<ProjectPlan, StoreError> {
        let record = db::get_project_plan(self.conn, id)?
            .ok_or_else(|| StoreError::not_found(Entity::ProjectPlan, id))?;
        let row_list = db::list_rows_for_plan(self.conn, id)?
            .into_iter()
            .map(|row| self.assemble_row(row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProjectPlan {
            id: record.id,
            title: record.title,
            row_list,
        })
    }

    fn load_row(&self, id: RowId) -> Result<Row, StoreError> {
        let record =
            db::get_row(self.conn, id)?.ok_or_else(|| StoreError::not_found(Entity::Row, id))?;
        self.assemble_row(record)
    }

    fn load_task(&self, id: TaskId) -> Result<Task, StoreError> {
        db::get_task(self.conn, id)?.ok_or_else(|| StoreError::not_found(Entity::Task, id))
    }

    fn create_project_plan(&self, title: &str) -> Result<ProjectPlan, StoreError> {
        let id = db::insert_project_plan(self.conn, title)?;
        self.load_project_plan(id)
    }

    fn create_row(&self, project_plan_id: PlanId, title: &str) -> Result<Row, StoreError> {
        if db::get_project_plan(self.conn, project_plan_id)?.is_none() {
            return Err(StoreError::not_found(Entity::ProjectPlan, project_plan_id));
        }
        let id = db::insert_row(self.conn, project_plan_id, title)?;
        self.load_row(id)
    }

    fn create_task(&self, task: &InsertTask<'_>) -> Result<Task, StoreError> {
        if db::get_row(self.conn, task.row_id)?.is_none() {
            return Err(StoreError::not_found(Entity::Row, task.row_id));
        }
        let id = db::insert_task(self.conn, task)?;
        self.load_task(id)
    }

    fn save_task(&self, task: &Task) -> Result<Task, StoreError> {
        if db::update_task(self.conn, task)? == 0 {
            return Err(StoreError::not_found(Entity::Task, task.id));
        }
        self.load_task(task.id)
    }

    fn save_row(&self, row: &Row) -> Result<(), StoreError> {
        let record = RowRecord {
            id: row.id,
            project_plan_id: row.project_plan_id,
            title: row.title.clone(),
        };
        if db::update_row(self.conn, &record)? == 0 {
            return Err(StoreError::not_found(Entity::Row, row.id));
        }
        Ok(())
    }

    fn save_project_plan(&self, plan: &ProjectPlan) -> Result<(), StoreError> {
        if db::update_project_plan_title(self.conn, plan.id, &plan.title)? == 0 {
            return Err(StoreError::not_found(Entity::ProjectPlan, plan.id));
        }
        Ok(())
    }

    fn delete_row(&self, id: RowId) -> Result<(), StoreError> {
        if db::delete_row(self.conn, id)? == 0 {
            return Err(StoreError::not_found(Entity::Row, id));
        }
        Ok(())
    }

    fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        if db::delete_task(self.conn, id)? == 0 {
            return Err(StoreError::not_found(Entity::Task, id));
        }
        Ok(())
    }
}
