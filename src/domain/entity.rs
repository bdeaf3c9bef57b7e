use serde::{Deserialize, Serialize};

use super::{PlanId, RowId, TaskId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub row_id: RowId,
    pub title: String,
    pub size: i64,
    pub position: i64,
}

impl Task {
    /// Last slot this task claims; it holds `position..=last_slot()` in its
    /// row. A span running past `i64::MAX` is clamped to it.
    pub fn last_slot(&self) -> i64 {
        self.position.saturating_add(self.size.saturating_sub(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,
    pub project_plan_id: PlanId,
    pub title: String,
    /// Ordered by task id, not by position.
    pub task_list: Vec<Task>,
}

impl Row {
    pub fn find_task(&self, task_id: TaskId) -> Option<&Task> {
        self.task_list.iter().find(|task| task.id == task_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPlan {
    pub id: PlanId,
    pub title: String,
    pub row_list: Vec<Row>,
}

impl ProjectPlan {
    pub fn find_row(&self, row_id: RowId) -> Option<&Row> {
        self.row_list.iter().find(|row| row.id == row_id)
    }
}

/// Request shape for creating a task. Every field is optional so that shape
/// violations can be reported instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub id: Option<TaskId>,
    #[serde(default)]
    pub row_id: Option<RowId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewRow {
    #[serde(default)]
    pub id: Option<RowId>,
    pub project_plan_id: PlanId,
    pub title: String,
    #[serde(default, alias = "tasks")]
    pub task_list: Option<Vec<Task>>,
}
