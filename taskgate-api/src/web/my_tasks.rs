//! The signed-in user's own tasks and the task detail page

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use taskgate_shared::auth::{
    policy::{self, Action, ADMIN_PANEL_DENIED},
    principal::Principal,
};
use taskgate_shared::models::{
    profile::UserProfile,
    task::{Task, TaskScope, TaskStatus},
    user::User,
};
use tera::Context;
use uuid::Uuid;

use super::error::{PageError, PageResult};
use super::forms::{FormErrors, ProgressForm};
use super::templates::page_context;
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Set when redirected away from the admin task panel
    pub denied: Option<String>,
}

/// Status labels for `<select>` inputs
pub(crate) fn status_labels() -> Vec<&'static str> {
    TaskStatus::ALL.iter().map(|s| s.label()).collect()
}

/// `GET /my-tasks/`
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ViewOwnTasks)?;

    let tasks = Task::list(&state.db, TaskScope::AssignedTo(principal.user_id)).await?;

    let mut context = page_context(Some(&principal));
    context.insert("tasks", &tasks);
    if query.denied.is_some() {
        context.insert("notice", ADMIN_PANEL_DENIED);
    }

    Ok(state.templates.render("my_tasks.html", &context)?.into_response())
}

async fn own_task(state: &AppState, principal: &Principal, task_id: Uuid) -> PageResult<Task> {
    Task::find_in_scope(&state.db, task_id, TaskScope::AssignedTo(principal.user_id))
        .await?
        .ok_or(PageError::NotFound)
}

fn render_update(
    state: &AppState,
    mut context: Context,
    task: &Task,
    form: &ProgressForm,
    errors: &FormErrors,
) -> PageResult<Response> {
    context.insert("task", task);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("statuses", &status_labels());

    Ok(state.templates.render("my_task_update.html", &context)?.into_response())
}

/// `GET /my-tasks/:id/update/`
pub async fn update_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ViewOwnTasks)?;
    let task = own_task(&state, &principal, task_id).await?;

    render_update(
        &state,
        page_context(Some(&principal)),
        &task,
        &ProgressForm::from_task(&task),
        &FormErrors::default(),
    )
}

/// `POST /my-tasks/:id/update/`
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    Form(form): Form<ProgressForm>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ViewOwnTasks)?;
    let task = own_task(&state, &principal, task_id).await?;

    let progress = match form.clean() {
        Ok(progress) => progress,
        Err(errors) => {
            return render_update(&state, page_context(Some(&principal)), &task, &form, &errors)
        }
    };

    Task::update_progress(&state.db, task.id, &progress)
        .await?
        .ok_or(PageError::NotFound)?;

    tracing::info!(
        user_id = %principal.user_id,
        task_id = %task.id,
        status = %progress.status(),
        "Task progress updated"
    );

    Ok(Redirect::to("/my-tasks/").into_response())
}

/// `GET /tasks/:id/view/`
///
/// Visible to the assignee, the assignee's managing admins and SuperAdmins.
/// Anyone else gets a 404.
pub async fn detail(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> PageResult<Response> {
    let task = Task::find_by_id(&state.db, task_id)
        .await?
        .ok_or(PageError::NotFound)?;

    let managers = UserProfile::manager_ids(&state.db, task.assigned_to).await?;
    if !policy::can_view_task(&principal, task.assigned_to, &managers) {
        tracing::warn!(user_id = %principal.user_id, task_id = %task.id, "Task detail outside scope");
        return Err(PageError::NotFound);
    }

    let assignee = User::find_by_id(&state.db, task.assigned_to)
        .await?
        .ok_or(PageError::NotFound)?;

    let mut context = page_context(Some(&principal));
    context.insert("task", &task);
    context.insert("assignee", &assignee);
    context.insert("is_assignee", &(task.assigned_to == principal.user_id));

    Ok(state.templates.render("task_detail.html", &context)?.into_response())
}
