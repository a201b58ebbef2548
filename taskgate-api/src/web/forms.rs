//! HTML form parsing and validation
//!
//! Every form arrives as `application/x-www-form-urlencoded` strings. Each
//! form's `clean` turns the raw strings into typed values or collects
//! [`FormErrors`] keyed by field name, which the page re-renders next to
//! the inputs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taskgate_shared::auth::password::password_problems;
use taskgate_shared::lifecycle::{self, Progress};
use taskgate_shared::models::task::{Task, TaskStatus};
use taskgate_shared::models::user::User;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

pub const REQUIRED: &str = "This field is required.";

pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

pub const BAD_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

pub const USERNAME_MAX_LENGTH: usize = 150;

pub const TITLE_MAX_LENGTH: usize = 255;

const EMAIL_MAX_LENGTH: usize = 254;

/// Date format of the `due_date` input
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validation errors for one form submission
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    /// Messages per field name
    pub fields: BTreeMap<String, Vec<String>>,

    /// Messages not tied to a field
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Collects `validator` failures, one message per failed rule
    pub fn from_validation(errors: &validator::ValidationErrors) -> Self {
        let mut form_errors = Self::default();

        for (field, errors) in errors.field_errors() {
            for error in errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| REQUIRED.to_string());
                form_errors.add(&field.to_string(), message);
            }
        }

        form_errors
    }

    fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

/// Checks a trimmed, required text field and its maximum length
fn required_text(value: &str, field: &str, max: Option<usize>, errors: &mut FormErrors) -> String {
    let value = value.trim();

    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if let Some(max) = max {
        let length = value.chars().count();
        if length > max {
            errors.add(field, max_length_message(max, length));
        }
    }

    value.to_string()
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn clean_username(raw: &str, taken: bool, errors: &mut FormErrors) -> String {
    let username = required_text(raw, "username", Some(USERNAME_MAX_LENGTH), errors);

    if !username.is_empty() && !is_valid_username(&username) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    } else if taken {
        errors.add("username", USERNAME_TAKEN);
    }

    username
}

fn clean_email(raw: &str, errors: &mut FormErrors) -> String {
    let email = raw.trim();

    if email.is_empty() {
        return String::new();
    }

    let length = email.chars().count();
    if length > EMAIL_MAX_LENGTH {
        errors.add("email", max_length_message(EMAIL_MAX_LENGTH, length));
    } else if !email.validate_email() {
        errors.add("email", "Enter a valid email address.");
    }

    email.to_string()
}

/// Login form (`/accounts/login/`)
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,

    #[serde(default)]
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,

    /// Where to go after logging in
    #[serde(default)]
    pub next: String,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        self.validate()
            .map_err(|e| FormErrors::from_validation(&e))
    }
}

/// Cleaned account creation input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// User/admin creation form
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AccountCreateForm {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing)]
    pub password1: String,

    #[serde(default, skip_serializing)]
    pub password2: String,
}

impl AccountCreateForm {
    /// Validates the form
    ///
    /// `username_taken` is the result of the uniqueness lookup for the
    /// trimmed username.
    pub fn clean(&self, username_taken: bool) -> Result<NewAccount, FormErrors> {
        let mut errors = FormErrors::default();

        let username = clean_username(&self.username, username_taken, &mut errors);
        let email = clean_email(&self.email, &mut errors);

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        }

        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", "The two password fields didn't match.");
            } else {
                for problem in password_problems(&self.password2) {
                    errors.add("password2", problem);
                }
            }
        }

        errors.finish(NewAccount {
            username,
            email,
            password: self.password1.clone(),
        })
    }
}

/// Cleaned account update input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountChanges {
    pub username: String,
    pub email: String,

    /// New password, if one was entered
    pub password: Option<String>,
}

/// User/admin edit form; the password is optional
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AccountUpdateForm {
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    #[serde(default, skip_serializing)]
    pub password_confirm: String,
}

impl AccountUpdateForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            ..Default::default()
        }
    }

    pub fn clean(&self, username_taken: bool) -> Result<AccountChanges, FormErrors> {
        let mut errors = FormErrors::default();

        let username = clean_username(&self.username, username_taken, &mut errors);
        let email = clean_email(&self.email, &mut errors);

        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords do not match.");
        } else if !self.password.is_empty() {
            for problem in password_problems(&self.password) {
                errors.add("password", problem);
            }
        }

        errors.finish(AccountChanges {
            username,
            email,
            password: Some(self.password.clone()).filter(|p| !p.is_empty()),
        })
    }
}

fn clean_status(raw: &str, errors: &mut FormErrors) -> Option<TaskStatus> {
    let raw = raw.trim();

    if raw.is_empty() {
        errors.add("status", REQUIRED);
        return None;
    }

    match raw.parse::<TaskStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            errors.add(
                "status",
                format!(
                    "Select a valid choice. {} is not one of the available choices.",
                    raw
                ),
            );
            None
        }
    }
}

fn clean_worked_hours(raw: &str, errors: &mut FormErrors) -> Option<i32> {
    let raw = raw.trim();

    if raw.is_empty() {
        return None;
    }

    match raw.parse::<i32>() {
        Ok(hours) if hours < 0 => {
            errors.add("worked_hours", "Ensure this value is greater than or equal to 0.");
            None
        }
        Ok(hours) => Some(hours),
        Err(_) => {
            errors.add("worked_hours", "Enter a whole number.");
            None
        }
    }
}

/// Parses the status and completion fields, then runs lifecycle validation
///
/// Lifecycle validation only runs once the individual fields parse.
fn clean_progress(
    status: &str,
    completion_report: &str,
    worked_hours: &str,
    errors: &mut FormErrors,
) -> Option<Progress> {
    let before = errors.fields.len();

    let status = clean_status(status, errors);
    let hours = clean_worked_hours(worked_hours, errors);
    let report = Some(completion_report.trim()).filter(|r| !r.is_empty());

    if errors.fields.len() > before {
        return None;
    }

    match lifecycle::validate(status?, report, hours) {
        Ok(progress) => Some(progress),
        Err(err) => {
            errors.add_non_field(err.to_string());
            None
        }
    }
}

/// The assignee's progress form (`/my-tasks/:id/update/`)
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProgressForm {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub completion_report: String,

    #[serde(default)]
    pub worked_hours: String,
}

impl ProgressForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            status: task.status.label().to_string(),
            completion_report: task.completion_report.clone().unwrap_or_default(),
            worked_hours: task
                .worked_hours
                .map(|h| h.to_string())
                .unwrap_or_default(),
        }
    }

    pub fn clean(&self) -> Result<Progress, FormErrors> {
        let mut errors = FormErrors::default();

        match clean_progress(
            &self.status,
            &self.completion_report,
            &self.worked_hours,
            &mut errors,
        ) {
            Some(progress) if errors.is_empty() => Ok(progress),
            _ => Err(errors),
        }
    }
}

/// Cleaned admin task input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: String,
    pub assigned_to: Uuid,
    pub due_date: NaiveDate,
    pub progress: Progress,
}

/// Admin task create/edit form
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TaskForm {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub assigned_to: String,

    #[serde(default)]
    pub due_date: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub completion_report: String,

    #[serde(default)]
    pub worked_hours: String,
}

impl TaskForm {
    /// Blank form for a new task
    pub fn new_task() -> Self {
        Self {
            status: TaskStatus::Pending.label().to_string(),
            ..Default::default()
        }
    }

    pub fn from_task(task: &Task) -> Self {
        let progress = ProgressForm::from_task(task);

        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            assigned_to: task.assigned_to.to_string(),
            due_date: task.due_date.format(DATE_FORMAT).to_string(),
            status: progress.status,
            completion_report: progress.completion_report,
            worked_hours: progress.worked_hours,
        }
    }

    /// Validates the form
    ///
    /// `choices` are the users the caller may assign the task to.
    pub fn clean(&self, choices: &[Uuid]) -> Result<TaskInput, FormErrors> {
        let mut errors = FormErrors::default();

        let title = required_text(&self.title, "title", Some(TITLE_MAX_LENGTH), &mut errors);
        let description = required_text(&self.description, "description", None, &mut errors);

        let assigned_to = match self.assigned_to.trim() {
            "" => {
                errors.add("assigned_to", REQUIRED);
                None
            }
            raw => match raw.parse::<Uuid>() {
                Ok(id) if choices.contains(&id) => Some(id),
                _ => {
                    errors.add("assigned_to", INVALID_CHOICE);
                    None
                }
            },
        };

        let due_date = match self.due_date.trim() {
            "" => {
                errors.add("due_date", REQUIRED);
                None
            }
            raw => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("due_date", "Enter a valid date.");
                    None
                }
            },
        };

        let progress = clean_progress(
            &self.status,
            &self.completion_report,
            &self.worked_hours,
            &mut errors,
        );

        match (assigned_to, due_date, progress) {
            (Some(assigned_to), Some(due_date), Some(progress)) => errors.finish(TaskInput {
                title,
                description,
                assigned_to,
                due_date,
                progress,
            }),
            _ => Err(errors),
        }
    }
}

/// Assign/unassign form: one user and one admin
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AssignForm {
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub admin: String,
}

impl AssignForm {
    /// Parses both IDs; group membership is checked by the handler
    pub fn clean(&self) -> Result<(Uuid, Uuid), FormErrors> {
        let mut errors = FormErrors::default();

        let mut parse = |field: &str, raw: &str| match raw.trim() {
            "" => {
                errors.add(field, REQUIRED);
                None
            }
            raw => raw.parse::<Uuid>().ok().or_else(|| {
                errors.add(field, INVALID_CHOICE);
                None
            }),
        };

        let user = parse("user", &self.user);
        let admin = parse("admin", &self.admin);

        match (user, admin) {
            (Some(user), Some(admin)) => Ok((user, admin)),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskgate_shared::lifecycle::COMPLETION_FIELDS_REQUIRED;

    fn task_form(status: &str, report: &str, hours: &str, assignee: Uuid) -> TaskForm {
        TaskForm {
            title: "Prepare quarterly report".to_string(),
            description: "Numbers for Q3".to_string(),
            assigned_to: assignee.to_string(),
            due_date: "2030-09-30".to_string(),
            status: status.to_string(),
            completion_report: report.to_string(),
            worked_hours: hours.to_string(),
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = LoginForm::default().clean().unwrap_err();
        assert_eq!(errors.fields["username"], vec![REQUIRED.to_string()]);
        assert_eq!(errors.fields["password"], vec![REQUIRED.to_string()]);

        let form = LoginForm {
            username: "alice".to_string(),
            password: "secret".to_string(),
            next: String::new(),
        };
        assert!(form.clean().is_ok());
    }

    #[test]
    fn test_account_create_form() {
        let form = AccountCreateForm {
            username: " alice ".to_string(),
            email: "alice@example.com".to_string(),
            password1: "correct-horse".to_string(),
            password2: "correct-horse".to_string(),
        };

        let account = form.clean(false).unwrap();
        assert_eq!(account.username, "alice");
        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.password, "correct-horse");

        let errors = form.clean(true).unwrap_err();
        assert_eq!(errors.fields["username"], vec![USERNAME_TAKEN.to_string()]);
    }

    #[test]
    fn test_account_create_rejects_bad_input() {
        let form = AccountCreateForm {
            username: "not valid!".to_string(),
            email: "nope".to_string(),
            password1: "12345678".to_string(),
            password2: "87654321".to_string(),
        };

        let errors = form.clean(false).unwrap_err();
        assert!(errors.fields["username"][0].starts_with("Enter a valid username."));
        assert_eq!(errors.fields["email"], vec!["Enter a valid email address.".to_string()]);
        assert_eq!(
            errors.fields["password2"],
            vec!["The two password fields didn't match.".to_string()]
        );
    }

    #[test]
    fn test_account_create_password_rules() {
        let form = AccountCreateForm {
            username: "bob".to_string(),
            email: String::new(),
            password1: "1234".to_string(),
            password2: "1234".to_string(),
        };

        let errors = form.clean(false).unwrap_err();
        assert_eq!(errors.fields["password2"].len(), 2);
        assert!(!errors.has("email"));
    }

    #[test]
    fn test_username_length_message() {
        let form = AccountCreateForm {
            username: "a".repeat(151),
            email: String::new(),
            password1: "correct-horse".to_string(),
            password2: "correct-horse".to_string(),
        };

        let errors = form.clean(false).unwrap_err();
        assert_eq!(
            errors.fields["username"],
            vec!["Ensure this value has at most 150 characters (it has 151).".to_string()]
        );
    }

    #[test]
    fn test_account_update_password_is_optional() {
        let form = AccountUpdateForm {
            username: "carol".to_string(),
            email: String::new(),
            password: String::new(),
            password_confirm: String::new(),
        };
        assert_eq!(form.clean(false).unwrap().password, None);

        let form = AccountUpdateForm {
            password: "new-password".to_string(),
            password_confirm: "other-password".to_string(),
            ..form
        };
        let errors = form.clean(false).unwrap_err();
        assert_eq!(errors.fields["password_confirm"], vec!["Passwords do not match.".to_string()]);

        let form = AccountUpdateForm {
            password_confirm: "new-password".to_string(),
            ..form
        };
        assert_eq!(form.clean(false).unwrap().password.as_deref(), Some("new-password"));
    }

    #[test]
    fn test_progress_form_completed_requires_fields() {
        let form = ProgressForm {
            status: "Completed".to_string(),
            completion_report: "   ".to_string(),
            worked_hours: String::new(),
        };

        let errors = form.clean().unwrap_err();
        assert_eq!(errors.non_field, vec![COMPLETION_FIELDS_REQUIRED.to_string()]);

        let form = ProgressForm {
            completion_report: "Shipped".to_string(),
            worked_hours: "4".to_string(),
            ..form
        };
        assert_eq!(
            form.clean().unwrap(),
            Progress::Completed {
                report: "Shipped".to_string(),
                worked_hours: 4,
            }
        );
    }

    #[test]
    fn test_progress_form_discards_fields_when_not_completed() {
        let form = ProgressForm {
            status: "In Progress".to_string(),
            completion_report: "draft".to_string(),
            worked_hours: "2".to_string(),
        };

        assert_eq!(form.clean().unwrap(), Progress::InProgress);
    }

    #[test]
    fn test_progress_form_field_errors() {
        let form = ProgressForm {
            status: "Done".to_string(),
            completion_report: String::new(),
            worked_hours: "two".to_string(),
        };

        let errors = form.clean().unwrap_err();
        assert!(errors.fields["status"][0].contains("Done is not one of the available choices"));
        assert_eq!(errors.fields["worked_hours"], vec!["Enter a whole number.".to_string()]);
        assert!(errors.non_field.is_empty());

        let form = ProgressForm {
            status: "Completed".to_string(),
            completion_report: "done".to_string(),
            worked_hours: "-1".to_string(),
        };
        let errors = form.clean().unwrap_err();
        assert_eq!(
            errors.fields["worked_hours"],
            vec!["Ensure this value is greater than or equal to 0.".to_string()]
        );
    }

    #[test]
    fn test_task_form_valid() {
        let assignee = Uuid::new_v4();
        let input = task_form("Pending", "", "", assignee).clean(&[assignee]).unwrap();

        assert_eq!(input.assigned_to, assignee);
        assert_eq!(input.due_date, NaiveDate::from_ymd_opt(2030, 9, 30).unwrap());
        assert_eq!(input.progress, Progress::Pending);
    }

    #[test]
    fn test_task_form_rejects_unlisted_assignee() {
        let assignee = Uuid::new_v4();
        let errors = task_form("Pending", "", "", assignee)
            .clean(&[Uuid::new_v4()])
            .unwrap_err();

        assert_eq!(errors.fields["assigned_to"], vec![INVALID_CHOICE.to_string()]);
    }

    #[test]
    fn test_task_form_required_fields_and_dates() {
        let form = TaskForm {
            due_date: "30/09/2030".to_string(),
            ..TaskForm::new_task()
        };

        let errors = form.clean(&[]).unwrap_err();
        assert_eq!(errors.fields["title"], vec![REQUIRED.to_string()]);
        assert_eq!(errors.fields["description"], vec![REQUIRED.to_string()]);
        assert_eq!(errors.fields["assigned_to"], vec![REQUIRED.to_string()]);
        assert_eq!(errors.fields["due_date"], vec!["Enter a valid date.".to_string()]);
    }

    #[test]
    fn test_task_form_completed_needs_positive_hours() {
        let assignee = Uuid::new_v4();
        let errors = task_form("Completed", "All done", "0", assignee)
            .clean(&[assignee])
            .unwrap_err();

        assert_eq!(errors.non_field, vec![COMPLETION_FIELDS_REQUIRED.to_string()]);
    }

    #[test]
    fn test_assign_form() {
        let user = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let form = AssignForm {
            user: user.to_string(),
            admin: admin.to_string(),
        };
        assert_eq!(form.clean().unwrap(), (user, admin));

        let errors = AssignForm {
            user: "garbage".to_string(),
            admin: String::new(),
        }
        .clean()
        .unwrap_err();
        assert_eq!(errors.fields["user"], vec![INVALID_CHOICE.to_string()]);
        assert_eq!(errors.fields["admin"], vec![REQUIRED.to_string()]);
    }
}
