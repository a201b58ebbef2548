//! Authorization policy
//!
//! Every protected operation names an [`Action`] and calls [`authorize`]
//! before doing anything else. The capability table:
//!
//! | action | who |
//! |---|---|
//! | `ManageUsers`, `ManageAdmins`, `ChangeRole`, `ManageAssignments` | SuperAdmin |
//! | `ManageTasks`, `ViewTaskReport` | Admin or SuperAdmin |
//! | `UseTaskApi` | User group |
//! | `ViewOwnTasks` | any authenticated user |
//!
//! On top of the capability check, task access is narrowed by
//! [`task_scope`]: an Admin only reaches tasks whose assignee they manage.
//!
//! # Example
//!
//! ```
//! use taskgate_shared::auth::policy::{authorize, task_scope, Action};
//! use taskgate_shared::auth::principal::Principal;
//! use taskgate_shared::models::group::Group;
//! use taskgate_shared::models::task::TaskScope;
//! use uuid::Uuid;
//!
//! let admin = Principal {
//!     user_id: Uuid::new_v4(),
//!     username: "sam".to_string(),
//!     groups: vec![Group::Admin],
//!     is_superuser: false,
//! };
//!
//! assert!(authorize(&admin, Action::ManageTasks).is_ok());
//! assert!(authorize(&admin, Action::ManageUsers).is_err());
//! assert_eq!(task_scope(&admin), TaskScope::ManagedBy(admin.user_id));
//! ```

use uuid::Uuid;

use super::principal::Principal;
use crate::models::group::Group;
use crate::models::task::{TaskScope, TaskStatus};

/// Message for a denied capability check
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Notice shown when a User-group member is sent away from the admin task panel
pub const ADMIN_PANEL_DENIED: &str =
    "You do not have permission to access the admin task panel. Redirected to your tasks.";

/// Operations guarded by the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create, edit, delete and list regular users
    ManageUsers,

    /// Create, edit, delete and list admins
    ManageAdmins,

    /// Promote a user to admin or demote an admin to user
    ChangeRole,

    /// Add or remove Admin→User management edges
    ManageAssignments,

    /// Task CRUD pages
    ManageTasks,

    /// Read a task's completion report
    ViewTaskReport,

    /// JSON API listing and updating the caller's own tasks
    UseTaskApi,

    /// Pages listing and updating the caller's own tasks
    ViewOwnTasks,
}

/// Error type for policy checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// The principal lacks the capability for the action
    #[error("{}", PERMISSION_DENIED)]
    Forbidden(Action),

    /// Attempt to delete a superuser or SuperAdmin
    #[error("You cannot delete the superuser or a SuperAdmin.")]
    ProtectedAccount,

    /// Report requested for a task that is not completed
    #[error("Report only available for completed tasks.")]
    ReportUnavailable,
}

/// Checks that `principal` may perform `action`
///
/// # Errors
///
/// Returns `PolicyError::Forbidden` when the capability is missing. The
/// denial is logged at `warn`.
pub fn authorize(principal: &Principal, action: Action) -> Result<(), PolicyError> {
    let allowed = match action {
        Action::ManageUsers
        | Action::ManageAdmins
        | Action::ChangeRole
        | Action::ManageAssignments => principal.is_superadmin(),
        Action::ManageTasks | Action::ViewTaskReport => principal.is_staff(),
        Action::UseTaskApi => principal.in_group(Group::User),
        Action::ViewOwnTasks => true,
    };

    if allowed {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %principal.user_id,
            action = ?action,
            groups = ?principal.groups,
            "Permission denied"
        );
        Err(PolicyError::Forbidden(action))
    }
}

/// Where to send a principal instead of denying outright
///
/// - A plain Admin opening the user list lands on the admin task list.
/// - A User-group member opening the admin task list lands on their own
///   tasks with a notice.
///
/// Returns None when the normal capability check should run.
pub fn detour(principal: &Principal, action: Action) -> Option<&'static str> {
    match action {
        Action::ManageUsers if !principal.is_superadmin() && principal.in_group(Group::Admin) => {
            Some("/admin/tasks/")
        }
        Action::ManageTasks if !principal.is_staff() && principal.in_group(Group::User) => {
            Some("/my-tasks/?denied=1")
        }
        _ => None,
    }
}

/// Tasks visible to a principal
///
/// SuperAdmin sees everything, an Admin sees the tasks of users they manage,
/// and anyone else sees only their own.
pub fn task_scope(principal: &Principal) -> TaskScope {
    if principal.is_superadmin() {
        TaskScope::All
    } else if principal.in_group(Group::Admin) {
        TaskScope::ManagedBy(principal.user_id)
    } else {
        TaskScope::AssignedTo(principal.user_id)
    }
}

/// Whether a principal may open the detail page of a task
///
/// # Arguments
///
/// * `assignee` - the task's `assigned_to`
/// * `assignee_managers` - admins managing the assignee
pub fn can_view_task(principal: &Principal, assignee: Uuid, assignee_managers: &[Uuid]) -> bool {
    if principal.user_id == assignee {
        return true;
    }

    match task_scope(principal) {
        TaskScope::All => true,
        TaskScope::ManagedBy(admin_id) => assignee_managers.contains(&admin_id),
        TaskScope::AssignedTo(_) => false,
    }
}

/// Whether a principal may assign a task to `assignee`
///
/// SuperAdmin may pick anyone; everyone else only users they manage.
pub fn can_assign_to(principal: &Principal, assignee: Uuid, managed: &[Uuid]) -> bool {
    principal.is_superadmin() || managed.contains(&assignee)
}

/// Guards account deletion
///
/// # Errors
///
/// Returns `PolicyError::ProtectedAccount` if `target` is a superuser or in
/// the SuperAdmin group
pub fn check_account_deletion(target: &Principal) -> Result<(), PolicyError> {
    if target.is_superuser || target.is_superadmin() {
        tracing::warn!(user_id = %target.user_id, "Refused to delete protected account");
        return Err(PolicyError::ProtectedAccount);
    }
    Ok(())
}

/// Guards the report view
///
/// # Errors
///
/// Returns `PolicyError::ReportUnavailable` unless `status` is Completed
pub fn check_report_available(status: TaskStatus) -> Result<(), PolicyError> {
    if status.is_completed() {
        Ok(())
    } else {
        Err(PolicyError::ReportUnavailable)
    }
}

/// Page a principal lands on after logging in
pub fn landing_path(principal: &Principal) -> &'static str {
    if principal.is_superadmin() {
        "/admin/users/"
    } else if principal.in_group(Group::Admin) {
        "/admin/tasks/"
    } else {
        "/accounts/profile/"
    }
}
