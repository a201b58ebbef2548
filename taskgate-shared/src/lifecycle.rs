//! Task lifecycle validation
//!
//! A task moves through `Pending → In Progress → Completed`. The status decides
//! which of the completion fields may be set:
//!
//! | status       | completion_report | worked_hours |
//! |--------------|-------------------|--------------|
//! | Pending      | always null       | always null  |
//! | In Progress  | always null       | always null  |
//! | Completed    | required          | required, > 0 |
//!
//! Every write path (admin forms, the user's own progress form, the JSON API)
//! runs [`validate`] before touching the database. The result is a
//! [`Progress`], and the task persistence functions only accept a `Progress`,
//! so a task row can never be written in a state that breaks the rule above.
//!
//! # Example
//!
//! ```
//! use taskgate_shared::lifecycle::{validate, Progress};
//! use taskgate_shared::models::task::TaskStatus;
//!
//! // Values entered for a non-completed task are discarded
//! let progress = validate(TaskStatus::InProgress, Some("half done"), Some(3)).unwrap();
//! assert_eq!(progress, Progress::InProgress);
//!
//! // Completing requires both fields
//! assert!(validate(TaskStatus::Completed, Some("done"), None).is_err());
//! ```

use crate::models::task::TaskStatus;

/// Message shown when a completed task lacks its report or hours
pub const COMPLETION_FIELDS_REQUIRED: &str =
    "Completion report and worked hours are required for completed tasks.";

/// Error type for lifecycle validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Status is Completed but the report and/or hours are missing
    #[error("{}", COMPLETION_FIELDS_REQUIRED)]
    MissingCompletionFields {
        /// Names of the missing fields (`completion_report`, `worked_hours`)
        missing: Vec<&'static str>,
    },
}

impl LifecycleError {
    /// Fields the error applies to
    pub fn fields(&self) -> &[&'static str] {
        match self {
            LifecycleError::MissingCompletionFields { missing } => missing,
        }
    }
}

/// A validated lifecycle state
///
/// Only [`validate`] builds a `Completed` value from user input, which keeps
/// the report non-empty and the hours positive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Pending,

    InProgress,

    Completed {
        /// Trimmed, non-empty report
        report: String,

        /// Hours worked, always > 0
        worked_hours: i32,
    },
}

impl Progress {
    /// Status this progress persists as
    pub fn status(&self) -> TaskStatus {
        match self {
            Progress::Pending => TaskStatus::Pending,
            Progress::InProgress => TaskStatus::InProgress,
            Progress::Completed { .. } => TaskStatus::Completed,
        }
    }

    /// Completion report column value
    pub fn completion_report(&self) -> Option<&str> {
        match self {
            Progress::Completed { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Worked hours column value
    pub fn worked_hours(&self) -> Option<i32> {
        match self {
            Progress::Completed { worked_hours, .. } => Some(*worked_hours),
            _ => None,
        }
    }
}

/// Validates the completion fields against the requested status
///
/// - `Completed` needs a report that is non-empty after trimming and
///   hours greater than zero.
/// - Any other status drops whatever report or hours were supplied.
///
/// # Errors
///
/// Returns `LifecycleError::MissingCompletionFields` listing every missing
/// field when a completed task lacks its report or hours.
pub fn validate(
    status: TaskStatus,
    completion_report: Option<&str>,
    worked_hours: Option<i32>,
) -> Result<Progress, LifecycleError> {
    match status {
        TaskStatus::Pending => Ok(Progress::Pending),
        TaskStatus::InProgress => Ok(Progress::InProgress),
        TaskStatus::Completed => {
            let report = completion_report
                .map(str::trim)
                .filter(|r| !r.is_empty());
            let hours = worked_hours.filter(|h| *h > 0);

            match (report, hours) {
                (Some(report), Some(worked_hours)) => Ok(Progress::Completed {
                    report: report.to_string(),
                    worked_hours,
                }),
                (report, hours) => {
                    let mut missing = Vec::new();
                    if report.is_none() {
                        missing.push("completion_report");
                    }
                    if hours.is_none() {
                        missing.push("worked_hours");
                    }
                    Err(LifecycleError::MissingCompletionFields { missing })
                }
            }
        }
    }
}
