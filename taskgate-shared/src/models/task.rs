//! Task model and database operations
//!
//! Tasks are assigned to a single user and carry status-gated completion
//! fields. All writes take a validated [`Progress`](crate::lifecycle::Progress),
//! so the completion report and worked hours are only ever stored for
//! completed tasks.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_status AS ENUM ('pending', 'in_progress', 'completed');
//!
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     title VARCHAR(255) NOT NULL,
//!     description TEXT NOT NULL,
//!     assigned_to UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     due_date DATE NOT NULL,
//!     status task_status NOT NULL DEFAULT 'pending',
//!     completion_report TEXT,
//!     worked_hours INTEGER,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     CONSTRAINT tasks_completion_fields CHECK (...)
//! );
//! ```
//!
//! # Visibility
//!
//! Listing and lookup go through a [`TaskScope`] computed by the policy layer:
//!
//! - `All`: every task (SuperAdmin)
//! - `ManagedBy(admin)`: tasks whose assignee lists `admin` as a manager
//! - `AssignedTo(user)`: the user's own tasks
//!
//! # Example
//!
//! ```no_run
//! use taskgate_shared::lifecycle::Progress;
//! use taskgate_shared::models::task::{CreateTask, Task, TaskScope};
//! use chrono::NaiveDate;
//! use sqlx::PgPool;
//! use uuid::Uuid;
//!
//! # async fn example(pool: PgPool, assignee: Uuid) -> Result<(), sqlx::Error> {
//! let task = Task::create(&pool, CreateTask {
//!     title: "Write release notes".to_string(),
//!     description: "Summarize the changes in 1.2".to_string(),
//!     assigned_to: assignee,
//!     due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
//!     progress: Progress::Pending,
//! }).await?;
//!
//! let mine = Task::list(&pool, TaskScope::AssignedTo(assignee)).await?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::lifecycle::Progress;

/// Task lifecycle status
///
/// Stored as the `task_status` enum; serialized with the human labels used by
/// the forms and the JSON API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "Pending")]
    Pending,

    #[serde(rename = "In Progress")]
    InProgress,

    #[serde(rename = "Completed")]
    Completed,
}

impl TaskStatus {
    /// All statuses in lifecycle order
    pub const ALL: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    /// Human label (also the form/JSON value)
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown status label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown task status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.label() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    pub title: String,

    pub description: String,

    /// User the task is assigned to
    pub assigned_to: Uuid,

    pub due_date: NaiveDate,

    pub status: TaskStatus,

    /// Set iff `status` is Completed
    pub completion_report: Option<String>,

    /// Set iff `status` is Completed
    pub worked_hours: Option<i32>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Rebuilds the stored lifecycle state
    ///
    /// Rows always satisfy the completion constraint, so a completed row has
    /// both fields set.
    pub fn progress(&self) -> Progress {
        match (self.status, &self.completion_report, self.worked_hours) {
            (TaskStatus::Completed, Some(report), Some(worked_hours)) => Progress::Completed {
                report: report.clone(),
                worked_hours,
            },
            (TaskStatus::InProgress, _, _) => Progress::InProgress,
            _ => Progress::Pending,
        }
    }
}

/// Task joined with its assignee's username, for listings
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TaskListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,

    pub assignee_username: String,
}

/// Which tasks a caller may see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// Every task
    All,

    /// Tasks assigned to users managed by this admin
    ManagedBy(Uuid),

    /// Tasks assigned to this user
    AssignedTo(Uuid),
}

impl TaskScope {
    /// Appends the scope's filter to a query that selects from `tasks t`
    fn push_filter(&self, query: &mut QueryBuilder<'_, Postgres>) {
        match *self {
            TaskScope::All => {
                query.push(" WHERE TRUE");
            }
            TaskScope::ManagedBy(admin_id) => {
                query
                    .push(
                        " WHERE t.assigned_to IN (
                            SELECT p.user_id
                            FROM user_profiles p
                            JOIN user_profile_managers m ON m.profile_id = p.id
                            WHERE m.admin_id = ",
                    )
                    .push_bind(admin_id)
                    .push(")");
            }
            TaskScope::AssignedTo(user_id) => {
                query.push(" WHERE t.assigned_to = ").push_bind(user_id);
            }
        }
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub assigned_to: Uuid,
    pub due_date: NaiveDate,
    pub progress: Progress,
}

/// Input for a full task edit (admin form)
#[derive(Debug, Clone)]
pub struct UpdateTask {
    pub title: String,
    pub description: String,
    pub assigned_to: Uuid,
    pub due_date: NaiveDate,
    pub progress: Progress,
}

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.assigned_to, t.due_date, t.status,
    t.completion_report, t.worked_hours, t.created_at, t.updated_at";

impl Task {
    /// Creates a new task
    ///
    /// # Errors
    ///
    /// Returns an error if the assignee doesn't exist (foreign key violation)
    /// or the database connection fails.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (title, description, assigned_to, due_date, status,
                               completion_report, worked_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, description, assigned_to, due_date, status,
                      completion_report, worked_hours, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.assigned_to)
        .bind(data.due_date)
        .bind(data.progress.status())
        .bind(data.progress.completion_report())
        .bind(data.progress.worked_hours())
        .fetch_one(pool)
        .await?;

        tracing::debug!(task_id = %task.id, assigned_to = %task.assigned_to, "Task created");

        Ok(task)
    }

    /// Finds a task by ID regardless of scope
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query
            .push(TASK_COLUMNS)
            .push(" FROM tasks t WHERE t.id = ")
            .push_bind(id);

        query.build_query_as::<Task>().fetch_optional(pool).await
    }

    /// Finds a task by ID within a scope
    ///
    /// Returns None both when the task doesn't exist and when it lies outside
    /// the scope, so callers can answer 404 without leaking existence.
    pub async fn find_in_scope(
        pool: &PgPool,
        id: Uuid,
        scope: TaskScope,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(TASK_COLUMNS).push(" FROM tasks t");
        scope.push_filter(&mut query);
        query.push(" AND t.id = ").push_bind(id);

        query.build_query_as::<Task>().fetch_optional(pool).await
    }

    /// Lists the tasks in a scope, earliest due date first
    pub async fn list(pool: &PgPool, scope: TaskScope) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(TASK_COLUMNS).push(" FROM tasks t");
        scope.push_filter(&mut query);
        query.push(" ORDER BY t.due_date ASC, t.created_at ASC");

        query.build_query_as::<Task>().fetch_all(pool).await
    }

    /// Lists the tasks in a scope together with assignee usernames
    pub async fn list_with_assignees(
        pool: &PgPool,
        scope: TaskScope,
    ) -> Result<Vec<TaskListing>, sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query
            .push(TASK_COLUMNS)
            .push(", u.username AS assignee_username FROM tasks t JOIN users u ON u.id = t.assigned_to");
        scope.push_filter(&mut query);
        query.push(" ORDER BY t.due_date ASC, t.created_at ASC");

        query.build_query_as::<TaskListing>().fetch_all(pool).await
    }

    /// Replaces every editable field of a task
    ///
    /// # Returns
    ///
    /// The updated task, or None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, assigned_to = $4, due_date = $5,
                status = $6, completion_report = $7, worked_hours = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, assigned_to, due_date, status,
                      completion_report, worked_hours, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.assigned_to)
        .bind(data.due_date)
        .bind(data.progress.status())
        .bind(data.progress.completion_report())
        .bind(data.progress.worked_hours())
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Updates only the lifecycle fields (status, report, hours)
    ///
    /// This is the assignee's update path.
    pub async fn update_progress(
        pool: &PgPool,
        id: Uuid,
        progress: &Progress,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2, completion_report = $3, worked_hours = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, assigned_to, due_date, status,
                      completion_report, worked_hours, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(progress.status())
        .bind(progress.completion_report())
        .bind(progress.worked_hours())
        .fetch_optional(pool)
        .await?;

        if let Some(ref task) = task {
            tracing::debug!(task_id = %task.id, status = %task.status, "Task progress updated");
        }

        Ok(task)
    }

    /// Deletes a task
    ///
    /// # Returns
    ///
    /// True if the task was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(status: TaskStatus, report: Option<&str>, hours: Option<i32>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "Audit access logs".to_string(),
            description: "Review last week's logs".to_string(),
            assigned_to: Uuid::new_v4(),
            due_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            status,
            completion_report: report.map(str::to_string),
            worked_hours: hours,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_labels_parse_back() {
        for status in TaskStatus::ALL {
            assert_eq!(status.label().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("Done".parse::<TaskStatus>().is_err());
        assert!("in_progress".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_with_label() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");

        let status: TaskStatus = serde_json::from_str("\"Completed\"").unwrap();
        assert_eq!(status, TaskStatus::Completed);
    }

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }

    #[test]
    fn test_progress_from_row() {
        let task = sample_task(TaskStatus::Completed, Some("done"), Some(3));
        assert_eq!(
            task.progress(),
            Progress::Completed {
                report: "done".to_string(),
                worked_hours: 3,
            }
        );

        let task = sample_task(TaskStatus::InProgress, None, None);
        assert_eq!(task.progress(), Progress::InProgress);

        let task = sample_task(TaskStatus::Pending, None, None);
        assert_eq!(task.progress(), Progress::Pending);
    }

    #[test]
    fn test_listing_serializes_flat() {
        let listing = TaskListing {
            task: sample_task(TaskStatus::Pending, None, None),
            assignee_username: "alice".to_string(),
        };

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["assignee_username"], "alice");
        assert_eq!(json["status"], "Pending");
        assert!(json["completion_report"].is_null());
    }
}
