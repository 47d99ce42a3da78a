//! # Access Policy
//!
//! The single home of the privilege rule. Every guarded operation calls into
//! this module instead of inspecting roles itself.

use crate::error::ServiceError;
use crate::models::task;
use crate::models::user::{self, Role};

/// Role value that grants elevated access.
pub const PRIVILEGED_ROLE: Role = Role::Management;

/// Returns true when `user` may perform privileged actions: creating, editing
/// and deleting meetings and events, and viewing everyone's tasks.
///
/// Inactive users count as unauthenticated and are never privileged.
pub fn is_privileged(user: &user::Model) -> bool {
    user.is_active && (user.is_superuser || user.role == PRIVILEGED_ROLE)
}

/// Returns true when `user` may edit or delete `task`.
pub fn can_modify_task(user: &user::Model, task: &task::Model) -> bool {
    is_privileged(user) || (user.is_active && task.owner_id == Some(user.id))
}

pub fn ensure_privileged(user: &user::Model) -> Result<(), ServiceError> {
    if is_privileged(user) {
        Ok(())
    } else {
        tracing::info!(user_id = %user.id, "Privileged action refused");
        Err(ServiceError::Forbidden)
    }
}

pub fn ensure_can_modify_task(user: &user::Model, task: &task::Model) -> Result<(), ServiceError> {
    if can_modify_task(user, task) {
        Ok(())
    } else {
        tracing::info!(user_id = %user.id, task_id = %task.id, "Task modification refused");
        Err(ServiceError::Forbidden)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{task_owned_by, user};
    use super::*;

    #[test]
    fn superuser_is_privileged_regardless_of_role() {
        assert!(is_privileged(&user(Role::Manager, true)));
        assert!(is_privileged(&user(Role::Management, true)));
    }

    #[test]
    fn management_role_is_privileged() {
        assert!(is_privileged(&user(Role::Management, false)));
    }

    #[test]
    fn manager_role_is_not_privileged() {
        assert!(!is_privileged(&user(Role::Manager, false)));
    }

    #[test]
    fn inactive_superuser_is_not_privileged() {
        let mut admin = user(Role::Management, true);
        admin.is_active = false;
        assert!(!is_privileged(&admin));
    }

    #[test]
    fn owner_may_modify_own_task() {
        let owner = user(Role::Manager, false);
        let task = task_owned_by(Some(owner.id));
        assert!(can_modify_task(&owner, &task));
    }

    #[test]
    fn non_owner_cannot_modify_task() {
        let owner = user(Role::Manager, false);
        let other = user(Role::Manager, false);
        let task = task_owned_by(Some(owner.id));
        assert!(!can_modify_task(&other, &task));
        assert!(matches!(
            ensure_can_modify_task(&other, &task),
            Err(ServiceError::Forbidden)
        ));
    }

    #[test]
    fn unassigned_task_requires_privilege() {
        let member = user(Role::Manager, false);
        let task = task_owned_by(None);
        assert!(!can_modify_task(&member, &task));
        assert!(can_modify_task(&user(Role::Management, false), &task));
    }

    #[test]
    fn ensure_privileged_rejects_managers() {
        assert!(matches!(
            ensure_privileged(&user(Role::Manager, false)),
            Err(ServiceError::Forbidden)
        ));
        assert!(ensure_privileged(&user(Role::Management, false)).is_ok());
    }
}
