//! Home, login, logout and profile pages

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::Deserialize;
use taskgate_shared::auth::{
    jwt::{self, Claims, TokenType},
    password,
    policy::landing_path,
    principal::Principal,
};
use taskgate_shared::models::{profile::UserProfile, user::User};

use super::error::PageResult;
use super::forms::{FormErrors, LoginForm, BAD_LOGIN};
use super::templates::page_context;
use super::redirect_with_cookie;
use crate::app::AppState;
use crate::middleware::session::{current_principal, removal_cookie, safe_next, session_cookie};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub next: String,
}

/// `GET /`
pub async fn home(State(state): State<AppState>, headers: HeaderMap) -> PageResult<Html<String>> {
    let principal = current_principal(&state, &headers).await?;
    let context = page_context(principal.as_ref());

    state.templates.render("index.html", &context)
}

fn render_login(state: &AppState, form: &LoginForm, errors: &FormErrors) -> PageResult<Response> {
    let mut context = page_context(None);
    context.insert("form", form);
    context.insert("errors", errors);

    Ok(state.templates.render("login.html", &context)?.into_response())
}

/// `GET /accounts/login/`
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> PageResult<Response> {
    let form = LoginForm {
        next: query.next,
        ..Default::default()
    };

    render_login(&state, &form, &FormErrors::default())
}

/// `POST /accounts/login/`
///
/// On success issues a session cookie and redirects to `next` when it is a
/// local path, otherwise to the role's landing page.
pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> PageResult<Response> {
    if let Err(errors) = form.clean() {
        return render_login(&state, &form, &errors);
    }

    let user = match User::find_by_username(&state.db, &form.username).await? {
        Some(user) if password::verify_password(&form.password, &user.password_hash)? => user,
        _ => {
            tracing::info!(username = %form.username, "Failed login attempt");
            let mut errors = FormErrors::default();
            errors.add_non_field(BAD_LOGIN);
            return render_login(&state, &form, &errors);
        }
    };

    let Some(principal) = Principal::load(&state.db, user.id).await? else {
        let mut errors = FormErrors::default();
        errors.add_non_field(BAD_LOGIN);
        return render_login(&state, &form, &errors);
    };

    User::update_last_login(&state.db, user.id).await?;

    let token = jwt::create_token(&Claims::new(user.id, TokenType::Session), state.jwt_secret())?;
    let cookie = session_cookie(
        &state.config.session.cookie_name,
        token,
        state.config.api.production,
    );

    let target = safe_next(&form.next).unwrap_or_else(|| landing_path(&principal));

    tracing::info!(user_id = %user.id, role = ?principal.role(), "User logged in");

    Ok(redirect_with_cookie(target, cookie))
}

/// `GET|POST /accounts/logout/`
pub async fn logout(State(state): State<AppState>) -> Response {
    redirect_with_cookie("/", removal_cookie(&state.config.session.cookie_name))
}

/// `GET /accounts/profile/`
///
/// Creates the profile on first visit and lists the admins managing the user.
pub async fn profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> PageResult<Response> {
    let Some(user) = User::find_by_id(&state.db, principal.user_id).await? else {
        return Ok(Redirect::to("/accounts/login/").into_response());
    };

    let profile = UserProfile::get_or_create(&state.db, user.id).await?;
    let managers = UserProfile::managers(&state.db, user.id).await?;

    let mut context = page_context(Some(&principal));
    context.insert("user", &user);
    context.insert("profile", &profile);
    context.insert("managers", &managers);

    Ok(state.templates.render("profile.html", &context)?.into_response())
}
