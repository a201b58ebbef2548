//! User and admin management (SuperAdmin only)
//!
//! The same handlers serve `/admin/users/...` and `/admin/admins/...`; the
//! router attaches an [`AccountKind`] extension that picks the group new
//! accounts join and the list they return to.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Serialize;
use taskgate_shared::auth::{
    password::hash_password,
    policy::{self, Action},
    principal::Principal,
};
use taskgate_shared::models::{
    group::{Group, GroupMembership},
    user::{CreateUser, UpdateUser, User},
};
use tera::Context;
use uuid::Uuid;

use super::error::{PageError, PageResult};
use super::forms::{AccountCreateForm, AccountUpdateForm, FormErrors};
use super::templates::page_context;
use crate::app::AppState;

/// Which account list a management page works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccountKind {
    User,
    Admin,
}

impl AccountKind {
    pub fn base_path(&self) -> &'static str {
        match self {
            AccountKind::User => "/admin/users",
            AccountKind::Admin => "/admin/admins",
        }
    }

    pub fn list_path(&self) -> String {
        format!("{}/", self.base_path())
    }

    /// Group new accounts join
    pub fn group(&self) -> Group {
        match self {
            AccountKind::User => Group::User,
            AccountKind::Admin => Group::Admin,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            AccountKind::User => Action::ManageUsers,
            AccountKind::Admin => Action::ManageAdmins,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::User => "User",
            AccountKind::Admin => "Admin",
        }
    }

    /// Whether an account can be edited through this kind's pages
    ///
    /// The user pages cover every account; the admin pages only admins.
    fn covers(&self, account: &Principal) -> bool {
        match self {
            AccountKind::User => true,
            AccountKind::Admin => account.in_group(Group::Admin),
        }
    }
}

/// Role change requested from the admin pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Promote,
    Demote,
}

impl RoleChange {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "promote" => Some(RoleChange::Promote),
            "demote" => Some(RoleChange::Demote),
            _ => None,
        }
    }
}

fn kind_context(principal: &Principal, kind: AccountKind) -> Context {
    let mut context = page_context(Some(principal));
    context.insert("kind", kind.label());
    context.insert("list_path", &kind.list_path());
    context
}

/// Loads an account the kind's pages may edit, or 404
async fn target_account(state: &AppState, kind: AccountKind, id: Uuid) -> PageResult<(User, Principal)> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(PageError::NotFound)?;
    let target = Principal::load(&state.db, id)
        .await?
        .ok_or(PageError::NotFound)?;

    if !kind.covers(&target) {
        return Err(PageError::NotFound);
    }

    Ok((user, target))
}

/// `GET /admin/users/` and `GET /admin/admins/`
///
/// A plain Admin asking for the user list is sent to the admin task list.
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(kind): Extension<AccountKind>,
) -> PageResult<Response> {
    if let Some(path) = policy::detour(&principal, kind.action()) {
        return Ok(Redirect::to(path).into_response());
    }
    policy::authorize(&principal, kind.action())?;

    let mut context = kind_context(&principal, kind);

    let template = match kind {
        AccountKind::User => {
            context.insert("users", &User::list_with_groups(&state.db).await?);
            "users_list.html"
        }
        AccountKind::Admin => {
            context.insert("admins", &User::list_in_group(&state.db, Group::Admin).await?);
            "admins_list.html"
        }
    };

    Ok(state.templates.render(template, &context)?.into_response())
}

fn render_account_form<F: Serialize>(
    state: &AppState,
    mut context: Context,
    action: &str,
    form: &F,
    errors: &FormErrors,
    is_update: bool,
) -> PageResult<Response> {
    context.insert("action", action);
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("is_update", &is_update);

    Ok(state.templates.render("account_form.html", &context)?.into_response())
}

/// `GET .../create/`
pub async fn create_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(kind): Extension<AccountKind>,
) -> PageResult<Response> {
    policy::authorize(&principal, kind.action())?;

    render_account_form(
        &state,
        kind_context(&principal, kind),
        &format!("{}/create/", kind.base_path()),
        &AccountCreateForm::default(),
        &FormErrors::default(),
        false,
    )
}

/// `POST .../create/`
///
/// New accounts join the kind's group.
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(kind): Extension<AccountKind>,
    Form(form): Form<AccountCreateForm>,
) -> PageResult<Response> {
    policy::authorize(&principal, kind.action())?;

    let taken = User::username_taken(&state.db, form.username.trim(), None).await?;

    let account = match form.clean(taken) {
        Ok(account) => account,
        Err(errors) => {
            return render_account_form(
                &state,
                kind_context(&principal, kind),
                &format!("{}/create/", kind.base_path()),
                &form,
                &errors,
                false,
            )
        }
    };

    let user = User::create_with_group(
        &state.db,
        CreateUser {
            username: account.username,
            email: account.email,
            password_hash: hash_password(&account.password)?,
            is_superuser: false,
        },
        kind.group(),
    )
    .await?;

    tracing::info!(
        actor = %principal.user_id,
        user_id = %user.id,
        group = %kind.group(),
        "Account created"
    );

    Ok(Redirect::to(&kind.list_path()).into_response())
}

/// `GET .../:id/update/`
pub async fn update_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(kind): Extension<AccountKind>,
    Path(id): Path<Uuid>,
) -> PageResult<Response> {
    policy::authorize(&principal, kind.action())?;
    let (user, _) = target_account(&state, kind, id).await?;

    render_account_form(
        &state,
        kind_context(&principal, kind),
        &format!("{}/{}/update/", kind.base_path(), user.id),
        &AccountUpdateForm::from_user(&user),
        &FormErrors::default(),
        true,
    )
}

/// `POST .../:id/update/`
///
/// A blank password leaves the current one unchanged.
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(kind): Extension<AccountKind>,
    Path(id): Path<Uuid>,
    Form(form): Form<AccountUpdateForm>,
) -> PageResult<Response> {
    policy::authorize(&principal, kind.action())?;
    let (user, _) = target_account(&state, kind, id).await?;

    let taken = User::username_taken(&state.db, form.username.trim(), Some(user.id)).await?;

    let changes = match form.clean(taken) {
        Ok(changes) => changes,
        Err(errors) => {
            return render_account_form(
                &state,
                kind_context(&principal, kind),
                &format!("{}/{}/update/", kind.base_path(), user.id),
                &form,
                &errors,
                true,
            )
        }
    };

    let password_hash = changes.password.as_deref().map(hash_password).transpose()?;

    User::update(
        &state.db,
        user.id,
        UpdateUser {
            username: Some(changes.username),
            email: Some(changes.email),
            password_hash,
        },
    )
    .await?
    .ok_or(PageError::NotFound)?;

    tracing::info!(actor = %principal.user_id, user_id = %user.id, "Account updated");

    Ok(Redirect::to(&kind.list_path()).into_response())
}

/// `GET .../:id/delete/`: confirmation page
pub async fn delete_page(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(kind): Extension<AccountKind>,
    Path(id): Path<Uuid>,
) -> PageResult<Response> {
    policy::authorize(&principal, kind.action())?;
    let (user, target) = target_account(&state, kind, id).await?;
    policy::check_account_deletion(&target)?;

    let mut context = kind_context(&principal, kind);
    context.insert("object_label", &format!("{} \"{}\"", kind.label(), user.username));
    context.insert("action", &format!("{}/{}/delete/", kind.base_path(), user.id));
    context.insert("cancel", &kind.list_path());

    Ok(state.templates.render("confirm_delete.html", &context)?.into_response())
}

/// `POST .../:id/delete/`
///
/// Superusers and SuperAdmins can never be deleted.
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Extension(kind): Extension<AccountKind>,
    Path(id): Path<Uuid>,
) -> PageResult<Response> {
    policy::authorize(&principal, kind.action())?;
    let (user, target) = target_account(&state, kind, id).await?;
    policy::check_account_deletion(&target)?;

    User::delete(&state.db, user.id).await?;

    tracing::info!(actor = %principal.user_id, user_id = %user.id, "Account deleted");

    Ok(Redirect::to(&kind.list_path()).into_response())
}

/// `POST /admin/admins/:id/{promote|demote}/`
///
/// Promote moves a user into the Admin group and demote moves an admin back.
/// Any other action is a 404.
pub async fn change_role(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((id, action)): Path<(Uuid, String)>,
) -> PageResult<Response> {
    let change = RoleChange::parse(&action).ok_or(PageError::NotFound)?;
    policy::authorize(&principal, Action::ChangeRole)?;

    User::find_by_id(&state.db, id)
        .await?
        .ok_or(PageError::NotFound)?;

    let target = match change {
        RoleChange::Promote => {
            GroupMembership::promote(&state.db, id).await?;
            AccountKind::Admin.list_path()
        }
        RoleChange::Demote => {
            GroupMembership::demote(&state.db, id).await?;
            AccountKind::User.list_path()
        }
    };

    Ok(Redirect::to(&target).into_response())
}
