//! Task endpoints of the JSON API
//!
//! ```text
//! GET       /tasks/             own tasks (User group)
//! PUT|PATCH /tasks/:id/         update status/report/hours of an own task
//! GET       /tasks/:id/report/  completion report (Admin/SuperAdmin, scoped)
//! ```
//!
//! Updates merge the request into the stored task, so fields left out keep
//! their current values. The merged state then goes through lifecycle
//! validation: moving away from Completed clears the report and hours.
//!
//! # Errors
//!
//! - 403: the caller's role may not use the endpoint, or the task is not
//!   Completed (report)
//! - 404: the task doesn't exist or is outside the caller's scope
//! - 422: lifecycle validation failed

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskgate_shared::{
    auth::{
        policy::{self, Action},
        principal::Principal,
    },
    lifecycle,
    models::task::{Task, TaskScope, TaskStatus},
};
use uuid::Uuid;

/// Partial task update; absent fields keep their values
///
/// Other task fields in the body are ignored: the assignee only controls
/// the lifecycle fields.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub status: Option<TaskStatus>,
    pub completion_report: Option<String>,
    pub worked_hours: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskReport {
    pub id: Uuid,
    pub title: String,
    pub assigned_to: Uuid,
    pub completion_report: Option<String>,
    pub worked_hours: Option<i32>,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Lists the caller's own tasks, earliest due first
pub async fn list_own_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<Task>>> {
    policy::authorize(&principal, Action::UseTaskApi)?;

    let tasks = Task::list(&state.db, TaskScope::AssignedTo(principal.user_id)).await?;

    Ok(Json(tasks))
}

/// Updates the lifecycle fields of one of the caller's tasks
pub async fn update_own_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    policy::authorize(&principal, Action::UseTaskApi)?;

    let Json(req) = payload.map_err(|rejection| match rejection {
        JsonRejection::JsonDataError(e) => {
            ApiError::ValidationError(vec![ValidationErrorDetail::new("body", e.body_text())])
        }
        other => ApiError::BadRequest(other.body_text()),
    })?;

    let task = Task::find_in_scope(&state.db, task_id, TaskScope::AssignedTo(principal.user_id))
        .await?
        .ok_or_else(task_not_found)?;

    let status = req.status.unwrap_or(task.status);
    let completion_report = req.completion_report.or(task.completion_report);
    let worked_hours = req.worked_hours.or(task.worked_hours);

    let progress = lifecycle::validate(status, completion_report.as_deref(), worked_hours)?;

    let updated = Task::update_progress(&state.db, task.id, &progress)
        .await?
        .ok_or_else(task_not_found)?;

    tracing::info!(
        user_id = %principal.user_id,
        task_id = %updated.id,
        status = %updated.status,
        "Task updated via API"
    );

    Ok(Json(updated))
}

/// Returns the completion report of a visible, completed task
pub async fn task_report(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskReport>> {
    policy::authorize(&principal, Action::ViewTaskReport)?;

    let task = Task::find_in_scope(&state.db, task_id, policy::task_scope(&principal))
        .await?
        .ok_or_else(task_not_found)?;

    policy::check_report_available(task.status)?;

    Ok(Json(TaskReport {
        id: task.id,
        title: task.title,
        assigned_to: task.assigned_to,
        completion_report: task.completion_report,
        worked_hours: task.worked_hours,
    }))
}
