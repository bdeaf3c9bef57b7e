use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{PlanId, RowId, TaskId};

/// One field of a partial update: either leave the stored value alone or
/// replace it. An absent key and an explicit JSON `null` both mean
/// `Unchanged`; `""` for a string field is `Set("")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Unchanged,
    Set(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unchanged
    }
}

impl<T> Field<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Field::Unchanged)
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Field::Set(value) => Some(value),
            Field::Unchanged => None,
        }
    }
}

impl<T: Clone> Field<T> {
    /// The value this field resolves to when applied over `current`.
    pub fn resolve(&self, current: &T) -> T {
        match self {
            Field::Set(value) => value.clone(),
            Field::Unchanged => current.clone(),
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Unchanged, Field::Set)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Field::from)
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Field::Set(value) => value.serialize(serializer),
            Field::Unchanged => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatchTemplate {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub row_id: Field<RowId>,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub title: Field<String>,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub size: Field<i64>,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub position: Field<i64>,
}

impl TaskPatchTemplate {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            row_id: Field::Unchanged,
            title: Field::Unchanged,
            size: Field::Unchanged,
            position: Field::Unchanged,
        }
    }

    pub fn with_row_id(mut self, row_id: RowId) -> Self {
        self.row_id = Field::Set(row_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Field::Set(title.into());
        self
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = Field::Set(size);
        self
    }

    pub fn with_position(mut self, position: i64) -> Self {
        self.position = Field::Set(position);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPatchTemplate {
    pub id: RowId,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub title: Field<String>,
    #[serde(default, alias = "tasks", skip_serializing_if = "Option::is_none")]
    pub task_list: Option<Vec<TaskPatchTemplate>>,
}

impl RowPatchTemplate {
    pub fn new(id: RowId) -> Self {
        Self {
            id,
            title: Field::Unchanged,
            task_list: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Field::Set(title.into());
        self
    }

    pub fn with_task(mut self, task: TaskPatchTemplate) -> Self {
        self.task_list.get_or_insert_with(Vec::new).push(task);
        self
    }

    /// `None` and an empty list both mean "no task changes".
    pub fn task_patches(&self) -> &[TaskPatchTemplate] {
        self.task_list.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPlanPatchTemplate {
    pub id: PlanId,
    #[serde(default, skip_serializing_if = "Field::is_unchanged")]
    pub title: Field<String>,
    #[serde(default, alias = "rows", skip_serializing_if = "Option::is_none")]
    pub row_list: Option<Vec<RowPatchTemplate>>,
}

impl ProjectPlanPatchTemplate {
    pub fn new(id: PlanId) -> Self {
        Self {
            id,
            title: Field::Unchanged,
            row_list: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Field::Set(title.into());
        self
    }

    pub fn with_row(mut self, row: RowPatchTemplate) -> Self {
        self.row_list.get_or_insert_with(Vec::new).push(row);
        self
    }

    pub fn row_patches(&self) -> &[RowPatchTemplate] {
        self.row_list.as_deref().unwrap_or(&[])
    }

    pub fn task_patches(&self) -> impl Iterator<Item = &TaskPatchTemplate> {
        self.row_patches()
            .iter()
            .flat_map(|row| row.task_patches().iter())
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, ProjectPlanPatchTemplate, RowPatchTemplate, TaskPatchTemplate};

    #[test]
    fn absent_and_null_fields_are_unchanged() {
        let patch: TaskPatchTemplate =
            serde_json::from_str(r#"{"id": 4, "size": null}"#).expect("patch should parse");
        assert_eq!(patch.id, 4);
        assert_eq!(patch.size, Field::Unchanged);
        assert_eq!(patch.position, Field::Unchanged);
        assert_eq!(patch.title, Field::Unchanged);
    }

    #[test]
    fn empty_title_is_an_explicit_value() {
        let patch: TaskPatchTemplate =
            serde_json::from_str(r#"{"id": 4, "title": ""}"#).expect("patch should parse");
        assert_eq!(patch.title, Field::Set(String::new()));
    }

    #[test]
    fn missing_task_id_is_rejected_by_the_parser() {
        let parsed = serde_json::from_str::<TaskPatchTemplate>(r#"{"position": 1}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn row_patch_accepts_tasks_alias_and_null_list() {
        let patch: RowPatchTemplate = serde_json::from_str(
            r#"{"id": 1, "title": "Ops", "tasks": [{"id": 10, "position": 3}]}"#,
        )
        .expect("row patch should parse");
        assert_eq!(patch.task_patches().len(), 1);
        assert_eq!(patch.task_patches()[0].position, Field::Set(3));

        let empty: RowPatchTemplate =
            serde_json::from_str(r#"{"id": 1, "taskList": null}"#).expect("row patch should parse");
        assert!(empty.task_patches().is_empty());
        assert!(empty.title.is_unchanged());
    }

    #[test]
    fn plan_patch_flattens_task_patches_in_order() {
        let patch = ProjectPlanPatchTemplate::new(1)
            .with_row(
                RowPatchTemplate::new(1)
                    .with_task(TaskPatchTemplate::new(10).with_position(4))
                    .with_task(TaskPatchTemplate::new(11).with_position(5)),
            )
            .with_row(RowPatchTemplate::new(2).with_task(TaskPatchTemplate::new(20)));
        let ids = patch.task_patches().map(|task| task.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![10, 11, 20]);
    }

    #[test]
    fn unchanged_fields_are_skipped_when_serializing() {
        let patch = TaskPatchTemplate::new(3).with_position(2);
        let value = serde_json::to_value(&patch).expect("patch should serialize");
        assert_eq!(value, serde_json::json!({"id": 3, "position": 2}));
    }

    #[test]
    fn resolve_prefers_set_value() {
        assert_eq!(Field::Set(5).resolve(&1), 5);
        assert_eq!(Field::<i64>::Unchanged.resolve(&1), 1);
        assert_eq!(Field::from(Some("x")).as_set(), Some(&"x"));
    }
}
