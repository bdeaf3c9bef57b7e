use crate::domain::entity::Task;
use crate::domain::patch::TaskPatchTemplate;

/// Overlay the fields present on `patch` onto `original`. The result always
/// keeps `original.id`; the patch id only selects which task to hydrate.
pub fn hydrate_task(original: &Task, patch: &TaskPatchTemplate) -> Task {
    Task {
        id: original.id,
        row_id: patch.row_id.resolve(&original.row_id),
        title: patch.title.resolve(&original.title),
        size: patch.size.resolve(&original.size),
        position: patch.position.resolve(&original.position),
    }
}
