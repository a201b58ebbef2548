//! Tera templates for the HTML pages
//!
//! Templates are compiled into the binary with `include_str!` and registered
//! under their file names. Names ending in `.html` are autoescaped.

use axum::response::Html;
use taskgate_shared::auth::principal::Principal;
use tera::{Context, Tera};

use super::error::PageError;
use super::forms::FormErrors;

const TEMPLATES: [(&str, &str); 17] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("macros.html", include_str!("../../templates/macros.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("profile.html", include_str!("../../templates/profile.html")),
    ("my_tasks.html", include_str!("../../templates/my_tasks.html")),
    ("my_task_update.html", include_str!("../../templates/my_task_update.html")),
    ("task_detail.html", include_str!("../../templates/task_detail.html")),
    ("users_list.html", include_str!("../../templates/users_list.html")),
    ("admins_list.html", include_str!("../../templates/admins_list.html")),
    ("account_form.html", include_str!("../../templates/account_form.html")),
    ("confirm_delete.html", include_str!("../../templates/confirm_delete.html")),
    ("admin_tasks.html", include_str!("../../templates/admin_tasks.html")),
    ("task_form.html", include_str!("../../templates/task_form.html")),
    ("task_report.html", include_str!("../../templates/task_report.html")),
    ("assign_user_form.html", include_str!("../../templates/assign_user_form.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

/// Compiled page templates
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Compiles every page template
    ///
    /// # Errors
    ///
    /// Returns a `tera::Error` if a template fails to parse
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<Html<String>, PageError> {
        Ok(Html(self.tera.render(name, context)?))
    }
}

/// Base context for a page: navigation state plus empty form errors
pub fn page_context(principal: Option<&Principal>) -> Context {
    let mut context = Context::new();

    if let Some(principal) = principal {
        context.insert("principal", principal);
        context.insert("role", &principal.role().map(|g| g.as_str()));
        context.insert("is_superadmin", &principal.is_superadmin());
        context.insert("is_staff", &principal.is_staff());
    }

    context.insert("errors", &FormErrors::default());
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_shared::models::group::Group;
    use uuid::Uuid;

    fn principal(groups: Vec<Group>) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            username: "<b>alice</b>".to_string(),
            groups,
            is_superuser: false,
        }
    }

    #[test]
    fn test_templates_compile() {
        assert!(Templates::new().is_ok());
    }

    #[test]
    fn test_anonymous_home_page() {
        let templates = Templates::new().unwrap();
        let Html(body) = templates.render("index.html", &page_context(None)).unwrap();

        assert!(body.contains("/accounts/login/"));
        assert!(!body.contains("/accounts/logout/"));
    }

    #[test]
    fn test_navigation_follows_role() {
        let templates = Templates::new().unwrap();

        let Html(body) = templates
            .render("index.html", &page_context(Some(&principal(vec![Group::SuperAdmin]))))
            .unwrap();
        assert!(body.contains("/admin/users/"));
        assert!(body.contains("/admin/users/assign/"));

        let Html(body) = templates
            .render("index.html", &page_context(Some(&principal(vec![Group::User]))))
            .unwrap();
        assert!(body.contains("/my-tasks/"));
        assert!(!body.contains("/admin/users/"));
        assert!(!body.contains("/admin/tasks/"));
    }

    #[test]
    fn test_usernames_are_escaped() {
        let templates = Templates::new().unwrap();
        let Html(body) = templates
            .render("index.html", &page_context(Some(&principal(vec![Group::User]))))
            .unwrap();

        assert!(body.contains("&lt;b&gt;alice&lt;&#x2F;b&gt;"));
        assert!(!body.contains("<b>alice</b>"));
    }
}
