//! Page sessions
//!
//! The HTML pages authenticate with a cookie holding a session JWT (see
//! `taskgate_shared::auth::jwt`). The cookie is `HttpOnly`, `SameSite=Lax`,
//! scoped to `/` and `Secure` in production. Lax same-site rules keep
//! cross-site form posts from carrying it.
//!
//! Anonymous requests for a protected page are redirected to
//! `/accounts/login/?next=<path>`.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use cookie::{Cookie, SameSite};
use taskgate_shared::auth::jwt::{self, TokenType};
use taskgate_shared::auth::principal::Principal;

use crate::app::AppState;
use crate::web::error::PageError;

pub const LOGIN_PATH: &str = "/accounts/login/";

/// Reads the session token from the request cookies
fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value).filter_map(Result::ok))
        .find(|cookie| cookie.name() == cookie_name)
        .map(|cookie| cookie.value().to_string())
}

/// Resolves the signed-in principal, if any
///
/// An invalid or expired token, or a token for a deleted account, counts as
/// anonymous.
pub async fn current_principal(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Principal>, PageError> {
    let Some(token) = session_token(headers, &state.config.session.cookie_name) else {
        return Ok(None);
    };

    let claims = match jwt::validate_session_token(&token, state.jwt_secret()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session cookie");
            return Ok(None);
        }
    };

    Ok(Principal::load(&state.db, claims.sub).await?)
}

/// Accepts only local absolute paths as redirect targets
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would become
/// `//host`. Only printable ASCII is accepted, which also keeps the target a
/// valid `Location` header value.
pub fn safe_next(next: &str) -> Option<&str> {
    let is_local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && next.bytes().all(|b| b.is_ascii_graphic());
    is_local.then_some(next)
}

/// Login URL that returns to `next` afterwards
pub fn login_redirect(next: &str) -> Redirect {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => Redirect::to(&format!("{}?{}", LOGIN_PATH, query)),
        Err(_) => Redirect::to(LOGIN_PATH),
    }
}

/// Requires a signed-in user for every page behind it
///
/// Inserts the [`Principal`] into request extensions.
pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match current_principal(&state, req.headers()).await {
        Ok(Some(principal)) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Ok(None) => {
            let path = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string());
            login_redirect(&path).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Builds the session cookie for a freshly issued token
pub fn session_cookie(name: &str, token: String, secure: bool) -> Cookie<'static> {
    let lifetime = TokenType::Session.default_expiration().num_seconds();

    Cookie::build((name.to_string(), token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(cookie::time::Duration::seconds(lifetime))
        .build()
}

/// Cookie that clears the session
pub fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_string(), String::new()))
        .path("/")
        .build();
    cookie.make_removal();
    cookie
}
