use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::domain::entity::Task;
use crate::domain::{PlanId, RowId, TaskId};

pub const CURRENT_SCHEMA_VERSION: i64 = 2;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "baseline_plan_schema_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS project_plan (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS plan_row (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_plan_id INTEGER NOT NULL REFERENCES project_plan(id),
    title TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS task (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    row_id INTEGER NOT NULL REFERENCES plan_row(id),
    title TEXT NOT NULL,
    size INTEGER NOT NULL CHECK (size >= 1),
    position INTEGER NOT NULL
);
"#,
    },
    Migration {
        version: 2,
        name: "foreign_key_indexes_v1",
        sql: r#"
CREATE INDEX IF NOT EXISTS idx_plan_row_project_plan_id ON plan_row(project_plan_id);
CREATE INDEX IF NOT EXISTS idx_task_row_id ON task(row_id);
"#,
    },
];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    let stored_version: Option<i64> =
        tx.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get(0)
        })?;
    if let Some(version) = stored_version.filter(|version| *version > CURRENT_SCHEMA_VERSION) {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_MISMATCH),
            Some(format!(
                "database schema version {} is newer than the supported version {}",
                version, CURRENT_SCHEMA_VERSION
            )),
        ));
    }

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "applied schema migration"
        );
    }

    tx.commit()
}

fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRecord {
    pub id: PlanId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRecord {
    pub id: RowId,
    pub project_plan_id: PlanId,
    pub title: String,
}

pub struct InsertTask<'a> {
    pub row_id: RowId,
    pub title: &'a str,
    pub size: i64,
    pub position: i64,
}

pub fn insert_project_plan(conn: &Connection, title: &str) -> Result<PlanId> {
    conn.execute(
        "INSERT INTO project_plan (title) VALUES (?1)",
        params![title],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_project_plan(conn: &Connection, id: PlanId) -> Result<Option<PlanRecord>> {
    conn.query_row(
        "SELECT id, title FROM project_plan WHERE id = ?1",
        params![id],
        |row| {
            Ok(PlanRecord {
                id: row.get(0)?,
                title: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn update_project_plan_title(conn: &Connection, id: PlanId, title: &str) -> Result<usize> {
    conn.execute(
        "UPDATE project_plan SET title = ?2 WHERE id = ?1",
        params![id, title],
    )
}

pub fn insert_row(conn: &Connection, project_plan_id: PlanId, title: &str) -> Result<RowId> {
    conn.execute(
        "INSERT INTO plan_row (project_plan_id, title) VALUES (?1, ?2)",
        params![project_plan_id, title],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_row(conn: &Connection, id: RowId) -> Result<Option<RowRecord>> {
    conn.query_row(
        "SELECT id, project_plan_id, title FROM plan_row WHERE id = ?1",
        params![id],
        |row| {
            Ok(RowRecord {
                id: row.get(0)?,
                project_plan_id: row.get(1)?,
                title: row.get(2)?,
            })
        },
    )
    .optional()
}

pub fn list_rows_for_plan(conn: &Connection, project_plan_id: PlanId) -> Result<Vec<RowRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, project_plan_id, title
FROM plan_row
WHERE project_plan_id = ?1
ORDER BY id ASC
"#,
    )?;

    let mut rows = stmt.query(params![project_plan_id])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(RowRecord {
            id: row.get(0)?,
            project_plan_id: row.get(1)?,
            title: row.get(2)?,
        });
    }
    Ok(result)
}

pub fn update_row(conn: &Connection, record: &RowRecord) -> Result<usize> {
    conn.execute(
        "UPDATE plan_row SET project_plan_id = ?2, title = ?3 WHERE id = ?1",
        params![record.id, record.project_plan_id, record.title],
    )
}

pub fn delete_row(conn: &Connection, id: RowId) -> Result<usize> {
    conn.execute("DELETE FROM plan_row WHERE id = ?1", params![id])
}

pub fn insert_task(conn: &Connection, args: &InsertTask<'_>) -> Result<TaskId> {
    conn.execute(
        "INSERT INTO task (row_id, title, size, position) VALUES (?1, ?2, ?3, ?4)",
        params![args.row_id, args.title, args.size, args.position],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_task(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
    conn.query_row(
        "SELECT id, row_id, title, size, position FROM task WHERE id = ?1",
        params![id],
        task_from_row,
    )
    .optional()
}

pub fn list_tasks_for_row(conn: &Connection, row_id: RowId) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, row_id, title, size, position
FROM task
WHERE row_id = ?1
ORDER BY id ASC
"#,
    )?;

    let mut rows = stmt.query(params![row_id])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(task_from_row(row)?);
    }
    Ok(result)
}

pub fn update_task(conn: &Connection, task: &Task) -> Result<usize> {
    conn.execute(
        r#"
UPDATE task
SET row_id = ?2, title = ?3, size = ?4, position = ?5
WHERE id = ?1
"#,
        params![task.id, task.row_id, task.title, task.size, task.position],
    )
}

pub fn delete_task(conn: &Connection, id: TaskId) -> Result<usize> {
    conn.execute("DELETE FROM task WHERE id = ?1", params![id])
}

fn task_from_row(row: &rusqlite::Row<'_>) -> Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        row_id: row.get(1)?,
        title: row.get(2)?,
        size: row.get(3)?,
        position: row.get(4)?,
    })
}
