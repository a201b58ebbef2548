//! Server-rendered HTML pages
//!
//! Pages share the policy and data layer with the JSON API. Every protected
//! page sits behind the session middleware, which inserts the caller's
//! [`Principal`](taskgate_shared::auth::principal::Principal); handlers then
//! call `policy::authorize` for their action before touching data.
//!
//! Successful form posts redirect (303) and failed ones re-render the form
//! with field errors.

pub mod accounts;
pub mod admin_tasks;
pub mod assignments;
pub mod error;
pub mod forms;
pub mod my_tasks;
pub mod templates;
pub mod users;

use axum::{
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Router,
};
use cookie::Cookie;

use crate::app::AppState;
use users::AccountKind;

/// Pages reachable without a session
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(accounts::home))
        .route(
            "/accounts/login/",
            get(accounts::login_page).post(accounts::login),
        )
        .route(
            "/accounts/logout/",
            get(accounts::logout).post(accounts::logout),
        )
}

/// User or admin management pages under `kind`'s base path
fn account_routes(kind: AccountKind) -> Router<AppState> {
    let base = kind.base_path();

    Router::new()
        .route(&format!("{}/", base), get(users::list))
        .route(
            &format!("{}/create/", base),
            get(users::create_page).post(users::create),
        )
        .route(
            &format!("{}/:id/update/", base),
            get(users::update_page).post(users::update),
        )
        .route(
            &format!("{}/:id/delete/", base),
            get(users::delete_page).post(users::delete),
        )
        .layer(Extension(kind))
}

/// Pages that require a session
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts/profile/", get(accounts::profile))
        .route("/my-tasks/", get(my_tasks::list))
        .route(
            "/my-tasks/:id/update/",
            get(my_tasks::update_page).post(my_tasks::update),
        )
        .route("/tasks/:id/view/", get(my_tasks::detail))
        .merge(account_routes(AccountKind::User))
        .merge(account_routes(AccountKind::Admin))
        .route("/admin/admins/:id/:action/", post(users::change_role))
        .route(
            "/admin/users/assign/",
            get(assignments::assign_page).post(assignments::assign),
        )
        .route("/admin/users/unassign/", post(assignments::unassign))
        .route("/admin/tasks/", get(admin_tasks::list))
        .route(
            "/admin/tasks/create/",
            get(admin_tasks::create_page).post(admin_tasks::create),
        )
        .route(
            "/admin/tasks/:id/update/",
            get(admin_tasks::update_page).post(admin_tasks::update),
        )
        .route(
            "/admin/tasks/:id/delete/",
            get(admin_tasks::delete_page).post(admin_tasks::delete),
        )
        .route("/admin/tasks/:id/report/", get(admin_tasks::report))
}

/// 303 redirect that also sets a cookie
pub(crate) fn redirect_with_cookie(to: &str, cookie: Cookie<'static>) -> Response {
    ([(header::SET_COOKIE, cookie.to_string())], Redirect::to(to)).into_response()
}
