use std::fmt;

pub mod entity;
pub mod patch;

pub type PlanId = i64;
pub type RowId = i64;
pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    ProjectPlan,
    Row,
    Task,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::ProjectPlan => "project plan",
            Entity::Row => "row",
            Entity::Task => "task",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

