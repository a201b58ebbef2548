//! Admin task panel (Admin or SuperAdmin)
//!
//! Every lookup goes through the caller's task scope, so an Admin reaching
//! for a task of a user they don't manage gets a 404.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use taskgate_shared::auth::{
    policy::{self, Action},
    principal::Principal,
};
use taskgate_shared::models::{
    profile::UserProfile,
    task::{CreateTask, Task, UpdateTask},
    user::User,
};
use tera::Context;
use uuid::Uuid;

use super::error::{PageError, PageResult};
use super::forms::{FormErrors, TaskForm};
use super::my_tasks::status_labels;
use super::templates::page_context;
use crate::app::AppState;

const LIST_PATH: &str = "/admin/tasks/";

/// Users the caller may assign tasks to
///
/// SuperAdmin may pick any account; an Admin only the users they manage.
async fn assignee_choices(state: &AppState, principal: &Principal) -> PageResult<Vec<User>> {
    let (candidates, managed) = if principal.is_superadmin() {
        (User::list(&state.db).await?, Vec::new())
    } else {
        let managed = UserProfile::managed_users(&state.db, principal.user_id).await?;
        let ids: Vec<Uuid> = managed.iter().map(|u| u.id).collect();
        (managed, ids)
    };

    Ok(candidates
        .into_iter()
        .filter(|user| policy::can_assign_to(principal, user.id, &managed))
        .collect())
}

async fn scoped_task(state: &AppState, principal: &Principal, task_id: Uuid) -> PageResult<Task> {
    Task::find_in_scope(&state.db, task_id, policy::task_scope(principal))
        .await?
        .ok_or(PageError::NotFound)
}

fn render_form(
    state: &AppState,
    mut context: Context,
    action: &str,
    form: &TaskForm,
    errors: &FormErrors,
    choices: &[User],
) -> PageResult<Response> {
    context.insert("action", action);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("choices", choices);
    context.insert("statuses", &status_labels());

    Ok(state.templates.render("task_form.html", &context)?.into_response())
}

/// `GET /admin/tasks/`
///
/// A User-group member is sent to their own tasks with a notice.
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> PageResult<Response> {
    if let Some(path) = policy::detour(&principal, Action::ManageTasks) {
        return Ok(Redirect::to(path).into_response());
    }
    policy::authorize(&principal, Action::ManageTasks)?;

    let tasks = Task::list_with_assignees(&state.db, policy::task_scope(&principal)).await?;

    let mut context = page_context(Some(&principal));
    context.insert("tasks", &tasks);

    Ok(state.templates.render("admin_tasks.html", &context)?.into_response())
}

/// `GET /admin/tasks/create/`
pub async fn create_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageTasks)?;
    let choices = assignee_choices(&state, &principal).await?;

    let mut context = page_context(Some(&principal));
    context.insert("heading", "Create task");

    render_form(
        &state,
        context,
        "/admin/tasks/create/",
        &TaskForm::new_task(),
        &FormErrors::default(),
        &choices,
    )
}

/// `POST /admin/tasks/create/`
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<TaskForm>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageTasks)?;
    let choices = assignee_choices(&state, &principal).await?;
    let choice_ids: Vec<Uuid> = choices.iter().map(|u| u.id).collect();

    let input = match form.clean(&choice_ids) {
        Ok(input) => input,
        Err(errors) => {
            let mut context = page_context(Some(&principal));
            context.insert("heading", "Create task");
            return render_form(&state, context, "/admin/tasks/create/", &form, &errors, &choices);
        }
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            title: input.title,
            description: input.description,
            assigned_to: input.assigned_to,
            due_date: input.due_date,
            progress: input.progress,
        },
    )
    .await?;

    tracing::info!(actor = %principal.user_id, task_id = %task.id, assigned_to = %task.assigned_to, "Task created");

    Ok(Redirect::to(LIST_PATH).into_response())
}

/// `GET /admin/tasks/:id/update/`
pub async fn update_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageTasks)?;
    let task = scoped_task(&state, &principal, task_id).await?;
    let choices = assignee_choices(&state, &principal).await?;

    let mut context = page_context(Some(&principal));
    context.insert("heading", "Update task");

    render_form(
        &state,
        context,
        &format!("/admin/tasks/{}/update/", task.id),
        &TaskForm::from_task(&task),
        &FormErrors::default(),
        &choices,
    )
}

/// `POST /admin/tasks/:id/update/`
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    Form(form): Form<TaskForm>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageTasks)?;
    let task = scoped_task(&state, &principal, task_id).await?;
    let choices = assignee_choices(&state, &principal).await?;
    let choice_ids: Vec<Uuid> = choices.iter().map(|u| u.id).collect();

    let input = match form.clean(&choice_ids) {
        Ok(input) => input,
        Err(errors) => {
            let mut context = page_context(Some(&principal));
            context.insert("heading", "Update task");
            let action = format!("/admin/tasks/{}/update/", task.id);
            return render_form(&state, context, &action, &form, &errors, &choices);
        }
    };

    Task::update(
        &state.db,
        task.id,
        UpdateTask {
            title: input.title,
            description: input.description,
            assigned_to: input.assigned_to,
            due_date: input.due_date,
            progress: input.progress,
        },
    )
    .await?
    .ok_or(PageError::NotFound)?;

    tracing::info!(actor = %principal.user_id, task_id = %task.id, "Task updated");

    Ok(Redirect::to(LIST_PATH).into_response())
}

/// `GET /admin/tasks/:id/delete/`: confirmation page
pub async fn delete_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageTasks)?;
    let task = scoped_task(&state, &principal, task_id).await?;

    let mut context = page_context(Some(&principal));
    context.insert("object_label", &format!("task \"{}\"", task.title));
    context.insert("action", &format!("/admin/tasks/{}/delete/", task.id));
    context.insert("cancel", LIST_PATH);

    Ok(state.templates.render("confirm_delete.html", &context)?.into_response())
}

/// `POST /admin/tasks/:id/delete/`
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageTasks)?;
    let task = scoped_task(&state, &principal, task_id).await?;

    Task::delete(&state.db, task.id).await?;

    tracing::info!(actor = %principal.user_id, task_id = %task.id, "Task deleted");

    Ok(Redirect::to(LIST_PATH).into_response())
}

/// `GET /admin/tasks/:id/report/`
///
/// 404 outside the caller's scope, 403 unless the task is Completed.
pub async fn report(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ViewTaskReport)?;
    let task = scoped_task(&state, &principal, task_id).await?;
    policy::check_report_available(task.status)?;

    let assignee = User::find_by_id(&state.db, task.assigned_to)
        .await?
        .ok_or(PageError::NotFound)?;

    let mut context = page_context(Some(&principal));
    context.insert("task", &task);
    context.insert("assignee", &assignee);

    Ok(state.templates.render("task_report.html", &context)?.into_response())
}
