//! Admin→User assignment pages (SuperAdmin only)

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use taskgate_shared::auth::{
    policy::{self, Action},
    principal::Principal,
};
use taskgate_shared::models::{
    group::Group,
    profile::UserProfile,
    user::User,
};
use uuid::Uuid;

use super::error::PageResult;
use super::forms::{AssignForm, FormErrors, INVALID_CHOICE};
use super::templates::page_context;
use crate::app::AppState;

const ASSIGN_PATH: &str = "/admin/users/assign/";

async fn render_assign(
    state: &AppState,
    principal: &Principal,
    form: &AssignForm,
    errors: &FormErrors,
) -> PageResult<Response> {
    let mut context = page_context(Some(principal));
    context.insert("users", &User::list_in_group(&state.db, Group::User).await?);
    context.insert("admins", &User::list_in_group(&state.db, Group::Admin).await?);
    context.insert("assignments", &UserProfile::list_assignments(&state.db).await?);
    context.insert("form", form);
    context.insert("errors", errors);

    Ok(state.templates.render("assign_user_form.html", &context)?.into_response())
}

/// Checks that `id` belongs to an account in `group`
async fn check_member(
    state: &AppState,
    id: Uuid,
    group: Group,
    field: &str,
    errors: &mut FormErrors,
) -> PageResult<()> {
    let is_member = Principal::load(&state.db, id)
        .await?
        .is_some_and(|account| account.in_group(group));

    if !is_member {
        errors.add(field, INVALID_CHOICE);
    }

    Ok(())
}

/// Parses the form and checks the user and admin are in the right groups
async fn clean_assignment(state: &AppState, form: &AssignForm) -> PageResult<Result<(Uuid, Uuid), FormErrors>> {
    let (user_id, admin_id) = match form.clean() {
        Ok(ids) => ids,
        Err(errors) => return Ok(Err(errors)),
    };

    let mut errors = FormErrors::default();
    check_member(state, user_id, Group::User, "user", &mut errors).await?;
    check_member(state, admin_id, Group::Admin, "admin", &mut errors).await?;

    Ok(if errors.is_empty() {
        Ok((user_id, admin_id))
    } else {
        Err(errors)
    })
}

/// `GET /admin/users/assign/`
pub async fn assign_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageAssignments)?;

    render_assign(&state, &principal, &AssignForm::default(), &FormErrors::default()).await
}

/// `POST /admin/users/assign/`
///
/// Adds the admin to the user's managers, creating the profile if needed.
pub async fn assign(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<AssignForm>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageAssignments)?;

    let (user_id, admin_id) = match clean_assignment(&state, &form).await? {
        Ok(ids) => ids,
        Err(errors) => return render_assign(&state, &principal, &form, &errors).await,
    };

    UserProfile::add_manager(&state.db, user_id, admin_id).await?;

    tracing::info!(actor = %principal.user_id, user_id = %user_id, admin_id = %admin_id, "Admin assigned");

    Ok(Redirect::to(ASSIGN_PATH).into_response())
}

/// `POST /admin/users/unassign/`
///
/// Removing an edge that doesn't exist is a no-op.
pub async fn unassign(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<AssignForm>,
) -> PageResult<Response> {
    policy::authorize(&principal, Action::ManageAssignments)?;

    let (user_id, admin_id) = match form.clean() {
        Ok(ids) => ids,
        Err(errors) => return render_assign(&state, &principal, &form, &errors).await,
    };

    let removed = UserProfile::remove_manager(&state.db, user_id, admin_id).await?;

    tracing::info!(
        actor = %principal.user_id,
        user_id = %user_id,
        admin_id = %admin_id,
        removed,
        "Admin unassigned"
    );

    Ok(Redirect::to(ASSIGN_PATH).into_response())
}
