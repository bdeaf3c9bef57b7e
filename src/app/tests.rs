use super::{App, AppError, ErrorKind};
use crate::consistency::{ConsistencyError, ConsistencyScope, Violation};
use crate::domain::entity::{NewRow, NewTask, Row};
use crate::domain::patch::{ProjectPlanPatchTemplate, RowPatchTemplate, TaskPatchTemplate};
use crate::domain::Entity;
use std::path::PathBuf;
use uuid::Uuid;

fn unique_workspace() -> PathBuf {
    let root = std::env::temp_dir().join(format!("tpm-app-test-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&root).expect("temp workspace should be creatable");
    root
}

fn db_path(root: &std::path::Path) -> String {
    root.join(".tpm/state.sqlite")
        .to_str()
        .expect("utf8 path")
        .to_string()
}

fn new_task(row_id: i64, size: i64, position: i64) -> NewTask {
    NewTask {
        id: None,
        row_id: Some(row_id),
        title: Some(format!("{size}@{position}")),
        size: Some(size),
        position: Some(position),
    }
}

fn new_row(project_plan_id: i64, title: &str) -> NewRow {
    NewRow {
        id: None,
        project_plan_id,
        title: title.to_string(),
        task_list: None,
    }
}

/// A plan with one row holding tasks at positions 0, 1 and 2.
fn seeded(app: &mut App) -> Row {
    let plan = app
        .create_project_plan("Roadmap")
        .expect("plan should be created");
    let row = app
        .create_row(&new_row(plan.id, "Backend"))
        .expect("row should be created");
    for position in 0..3 {
        app.create_task(&new_task(row.id, 1, position))
            .expect("task should be created");
    }
    app.get_row(row.id).expect("row should load")
}

#[test]
fn open_creates_parent_directory_and_crud_roundtrips() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root)).expect("app should open");
    assert!(root.join(".tpm").is_dir());

    let row = seeded(&mut app);
    assert_eq!(row.task_list.len(), 3);
    assert_eq!(
        app.list_rows(row.project_plan_id)
            .expect("rows should list")
            .len(),
        1
    );
    let tasks = app.list_tasks(row.id).expect("tasks should list");
    assert_eq!(tasks, row.task_list);
    assert_eq!(
        app.get_task(tasks[0].id).expect("task should load"),
        tasks[0]
    );

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn accepted_patches_are_committed() {
    let root = unique_workspace();
    let path = db_path(&root);
    let (row_id, first) = {
        let mut app = App::open(&path).expect("app should open");
        let row = seeded(&mut app);
        let first = row.task_list[0].id;
        app.patch_row(
            row.id,
            &RowPatchTemplate::new(row.id)
                .with_title("Services")
                .with_task(TaskPatchTemplate::new(first).with_position(7)),
        )
        .expect("patch should apply");
        (row.id, first)
    };

    let reopened = App::open(&path).expect("app should reopen");
    let row = reopened.get_row(row_id).expect("row should load");
    assert_eq!(row.title, "Services");
    assert_eq!(row.find_task(first).map(|task| task.position), Some(7));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn rejected_patches_leave_titles_untouched() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root)).expect("app should open");
    let row = seeded(&mut app);
    let second = row.task_list[1].id;

    let err = app
        .patch_row(
            row.id,
            &RowPatchTemplate::new(row.id)
                .with_title("never saved")
                .with_task(TaskPatchTemplate::new(second).with_position(2)),
        )
        .expect_err("overlap should be rejected");
    assert_eq!(err.kind(), ErrorKind::ConsistencyViolation);
    assert_eq!(err.exit_code(), 5);
    assert_eq!(app.get_row(row.id).expect("row should load"), row);

    let plan_err = app
        .patch_project_plan(
            row.project_plan_id,
            &ProjectPlanPatchTemplate::new(row.project_plan_id)
                .with_title("never saved")
                .with_row(
                    RowPatchTemplate::new(row.id)
                        .with_task(TaskPatchTemplate::new(second).with_position(0)),
                ),
        )
        .expect_err("plan overlap should be rejected");
    assert!(matches!(
        plan_err,
        AppError::Consistency(ConsistencyError {
            scope: ConsistencyScope::ProjectPlan,
            violation: Violation::Overlap { .. },
        })
    ));
    assert_eq!(
        app.get_project_plan(row.project_plan_id)
            .expect("plan should load")
            .title,
        "Roadmap"
    );

    let _ = std::fs::remove_dir_all(root);
}

/// Let `allowed` task updates through, then abort every later one.
fn fail_task_updates_after(app: &App, allowed: i64) {
    app.conn
        .execute_batch(&format!(
            r#"
CREATE TABLE task_write_budget (remaining INTEGER NOT NULL);
INSERT INTO task_write_budget (remaining) VALUES ({allowed});
CREATE TRIGGER task_write_budget_guard BEFORE UPDATE ON task
BEGIN
    SELECT RAISE(ABORT, 'task write refused')
    WHERE (SELECT remaining FROM task_write_budget) <= 0;
    UPDATE task_write_budget SET remaining = remaining - 1;
END;
"#
        ))
        .expect("write budget trigger should install");
}

#[test]
fn failed_write_mid_patch_rolls_back_every_earlier_write() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root)).expect("app should open");
    let row = seeded(&mut app);
    fail_task_updates_after(&app, 2);

    let mut patch = RowPatchTemplate::new(row.id).with_title("Services");
    for (offset, task) in row.task_list.iter().enumerate() {
        patch = patch.with_task(TaskPatchTemplate::new(task.id).with_position(10 + offset as i64));
    }
    let err = app
        .patch_row(row.id, &patch)
        .expect_err("third task write should fail");
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("task write refused"), "{err}");

    assert_eq!(app.get_row(row.id).expect("row should load"), row);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn patch_task_moves_between_rows_of_one_plan() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root)).expect("app should open");
    let row = seeded(&mut app);
    let other = app
        .create_row(&new_row(row.project_plan_id, "Frontend"))
        .expect("row should be created");
    let moving = row.task_list[2].id;

    let moved = app
        .patch_task(
            moving,
            &TaskPatchTemplate::new(moving)
                .with_row_id(other.id)
                .with_position(4),
        )
        .expect("move should apply");
    assert_eq!((moved.row_id, moved.position), (other.id, 4));
    assert_eq!(app.list_tasks(row.id).expect("tasks").len(), 2);
    assert_eq!(app.list_tasks(other.id).expect("tasks"), vec![moved]);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn create_validates_shape_and_parents() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root)).expect("app should open");

    let missing_plan = app
        .create_row(&new_row(42, "orphan"))
        .expect_err("plan must exist");
    assert!(matches!(
        missing_plan,
        AppError::NotFound {
            entity: Entity::ProjectPlan,
            id: 42
        }
    ));
    assert_eq!(missing_plan.exit_code(), 3);

    let mut with_id = new_task(1, 1, 0);
    with_id.id = Some(5);
    assert_eq!(
        app.create_task(&with_id).expect_err("id not allowed").kind(),
        ErrorKind::StructuralInvalid
    );
    assert_eq!(
        app.create_task(&new_task(1, 1, 0))
            .expect_err("row must exist")
            .kind(),
        ErrorKind::NotFound
    );

    let row = seeded(&mut app);
    let overlapping = app
        .create_task(&new_task(row.id, 1, 0))
        .expect("creation performs no occupancy check");
    assert_eq!(overlapping.position, 0);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn delete_row_requires_empty_row_and_delete_task_checks_ownership() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root)).expect("app should open");
    let row = seeded(&mut app);

    let busy = app.delete_row(row.id).expect_err("row still has tasks");
    assert_eq!(busy.kind(), ErrorKind::StructuralInvalid);

    let task = &row.task_list[0];
    let mismatch = app
        .delete_task(row.id + 100, task.id)
        .expect_err("task belongs to another row");
    assert!(matches!(
        mismatch,
        AppError::MismatchedIds {
            entity: Entity::Row,
            ..
        }
    ));
    assert_eq!(mismatch.exit_code(), 2);

    for task in &row.task_list {
        let deleted = app.delete_task(row.id, task.id).expect("delete should work");
        assert_eq!(&deleted, task);
    }
    let deleted = app.delete_row(row.id).expect("empty row should delete");
    assert_eq!(deleted.id, row.id);
    assert_eq!(
        app.get_row(row.id).expect_err("row is gone").kind(),
        ErrorKind::NotFound
    );

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn check_row_patch_reports_candidates_without_writing() {
    let root = unique_workspace();
    let mut app = App::open(&db_path(&root)).expect("app should open");
    let row = seeded(&mut app);
    let first = row.task_list[0].id;

    let report = app
        .check_row_patch(
            row.id,
            &RowPatchTemplate::new(row.id).with_task(TaskPatchTemplate::new(first).with_size(4)),
        )
        .expect_err("growing into neighbours should fail");
    assert_eq!(report.kind(), ErrorKind::ConsistencyViolation);

    let report = app
        .check_row_patch(
            row.id,
            &RowPatchTemplate::new(row.id)
                .with_task(TaskPatchTemplate::new(first).with_position(9)),
        )
        .expect("free slot should pass");
    assert!(report.valid);
    assert_eq!(report.candidates[0].position, 9);
    assert_eq!(app.get_row(row.id).expect("row should load"), row);

    let unknown = app
        .check_row_patch(
            row.id,
            &RowPatchTemplate::new(row.id).with_task(TaskPatchTemplate::new(13_000)),
        )
        .expect_err("unknown task should fail");
    assert_eq!(unknown.kind(), ErrorKind::UnknownReference);
    assert_eq!(unknown.exit_code(), 4);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn error_kinds_map_to_exit_codes() {
    assert_eq!(ErrorKind::NotFound.exit_code(), 3);
    assert_eq!(ErrorKind::UnknownReference.exit_code(), 4);
    assert_eq!(ErrorKind::ConsistencyViolation.exit_code(), 5);
    assert_eq!(ErrorKind::StructuralInvalid.exit_code(), 2);
    assert_eq!(ErrorKind::MismatchedIds.exit_code(), 2);
    assert_eq!(ErrorKind::Internal.exit_code(), 1);

    let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("bad json");
    assert_eq!(AppError::from(json_err).kind(), ErrorKind::StructuralInvalid);
}
