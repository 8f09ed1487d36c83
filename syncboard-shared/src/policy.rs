/// Task authorization policy
///
/// Pure, side-effect-free predicates deciding whether an acting user may
/// perform an operation on a task. The lifecycle service evaluates these
/// strictly before touching the store, so a denied operation leaves no
/// partial state behind.
///
/// # Permission model
///
/// - Creator: may edit, delete, assign, and change status
/// - Assignee: may edit and change status, but not delete or reassign
/// - Everyone else: no access
///
/// # Example
///
/// ```
/// use syncboard_shared::policy;
/// # use syncboard_shared::models::task::Task;
/// # use uuid::Uuid;
/// # fn example(task: &Task) {
/// let user_id = Uuid::new_v4();
/// if policy::can_delete(task, user_id) {
///     // only the creator gets here
/// }
/// # }
/// ```

use uuid::Uuid;

use crate::models::task::Task;

/// True if the user may edit the task's fields.
///
/// The creator and the current assignee may edit.
pub fn can_edit(task: &Task, user_id: Uuid) -> bool {
    task.creator_id == user_id || task.assigned_to_id == Some(user_id)
}

/// True if the user may delete the task.
///
/// Deletion is a creator-only privilege.
pub fn can_delete(task: &Task, user_id: Uuid) -> bool {
    task.creator_id == user_id
}

/// True if the user may (re)assign the task.
///
/// Assignment is a creator-only privilege, stricter than a generic edit.
pub fn can_assign(task: &Task, user_id: Uuid) -> bool {
    task.creator_id == user_id
}

/// True if the user may change the task's status.
///
/// Same rule as [`can_edit`]: creator or current assignee.
pub fn can_change_status(task: &Task, user_id: Uuid) -> bool {
    can_edit(task, user_id)
}
