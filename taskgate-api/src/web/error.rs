//! Error pages
//!
//! Page handlers return `PageResult`. Status mapping matches the JSON API:
//! policy violations are 403 and missing or out-of-scope records are 404.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use taskgate_shared::auth::jwt::JwtError;
use taskgate_shared::auth::password::PasswordError;
use taskgate_shared::auth::policy::PolicyError;
use tera::{Context, Tera};
use thiserror::Error;

const ERROR_TEMPLATE: &str = include_str!("../../templates/error.html");

pub type PageResult<T> = Result<T, PageError>;

#[derive(Debug, Error)]
pub enum PageError {
    /// 403 with the message shown to the user
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 404
    #[error("Not found")]
    NotFound,

    /// 500; the message is logged, never shown
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PageError {
    pub fn status(&self) -> StatusCode {
        match self {
            PageError::Forbidden(_) => StatusCode::FORBIDDEN,
            PageError::NotFound => StatusCode::NOT_FOUND,
            PageError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn render(status: StatusCode, message: &str) -> String {
    let mut context = Context::new();
    context.insert("status", &status.as_u16());
    context.insert("reason", status.canonical_reason().unwrap_or("Error"));
    context.insert("message", message);

    Tera::one_off(ERROR_TEMPLATE, &context, true).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to render error page");
        format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or("Error"))
    })
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            PageError::Forbidden(msg) => msg,
            PageError::NotFound => "The requested page could not be found.".to_string(),
            PageError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "An internal error occurred.".to_string()
            }
        };

        (status, Html(render(status, &message))).into_response()
    }
}

impl From<sqlx::Error> for PageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => PageError::NotFound,
            _ => PageError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<PolicyError> for PageError {
    fn from(err: PolicyError) -> Self {
        PageError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for PageError {
    fn from(err: PasswordError) -> Self {
        PageError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for PageError {
    fn from(err: JwtError) -> Self {
        PageError::Internal(format!("Session token error: {}", err))
    }
}

impl From<tera::Error> for PageError {
    fn from(err: tera::Error) -> Self {
        PageError::Internal(format!("Template error: {:?}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_forbidden_page_shows_policy_message() {
        let response = PageError::from(PolicyError::ProtectedAccount).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = body_of(response).await;
        assert!(body.contains("You cannot delete the superuser or a SuperAdmin."));
    }

    #[tokio::test]
    async fn test_internal_page_hides_details() {
        let response = PageError::Internal("password authentication failed".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_of(response).await;
        assert!(!body.contains("password authentication failed"));
    }

    #[test]
    fn test_display_keeps_message() {
        let err = PageError::Forbidden("Nope".to_string());
        assert_eq!(err.to_string(), "Forbidden: Nope");
        assert_eq!(PageError::NotFound.to_string(), "Not found");
    }

    #[test]
    fn test_row_not_found_is_404() {
        assert_eq!(PageError::from(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
    }
}
