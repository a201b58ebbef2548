//! User profiles and the Admin→User management relation
//!
//! Each user has at most one profile, created lazily on first profile view or
//! first assignment. A profile holds the set of admins who manage the user;
//! those edges decide which tasks an admin can see.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE user_profiles (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE TABLE user_profile_managers (
//!     profile_id UUID NOT NULL REFERENCES user_profiles(id) ON DELETE CASCADE,
//!     admin_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (profile_id, admin_id)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::user::User;

/// User profile
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A managed user and the admins managing them
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub user: User,
    pub admins: Vec<User>,
}

/// Flat row of the assignment listing query
#[derive(sqlx::FromRow)]
struct AssignmentRow {
    #[sqlx(flatten)]
    user: User,
    admin_id: Uuid,
    admin_username: String,
    admin_email: String,
    admin_password_hash: String,
    admin_is_superuser: bool,
    admin_created_at: DateTime<Utc>,
    admin_updated_at: DateTime<Utc>,
    admin_last_login_at: Option<DateTime<Utc>>,
}

impl AssignmentRow {
    fn split(self) -> (User, User) {
        let admin = User {
            id: self.admin_id,
            username: self.admin_username,
            email: self.admin_email,
            password_hash: self.admin_password_hash,
            is_superuser: self.admin_is_superuser,
            created_at: self.admin_created_at,
            updated_at: self.admin_updated_at,
            last_login_at: self.admin_last_login_at,
        };
        (self.user, admin)
    }
}

/// Groups consecutive rows by user, preserving row order
fn fold_assignments(rows: Vec<AssignmentRow>) -> Vec<Assignment> {
    let mut assignments: Vec<Assignment> = Vec::new();

    for row in rows {
        let (user, admin) = row.split();
        match assignments.last_mut() {
            Some(last) if last.user.id == user.id => last.admins.push(admin),
            _ => assignments.push(Assignment {
                user,
                admins: vec![admin],
            }),
        }
    }

    assignments
}

impl UserProfile {
    /// Returns the user's profile, creating it if missing
    pub async fn get_or_create(pool: &PgPool, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let inserted = sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, created_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        if let Some(profile) = inserted {
            tracing::debug!(user_id = %user_id, profile_id = %profile.id, "Profile created");
            return Ok(profile);
        }

        sqlx::query_as::<_, UserProfile>(
            "SELECT id, user_id, created_at FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Lists the admins managing a user, by username
    ///
    /// Empty when the user has no profile yet.
    pub async fn managers(pool: &PgPool, user_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT a.id, a.username, a.email, a.password_hash, a.is_superuser,
                   a.created_at, a.updated_at, a.last_login_at
            FROM user_profiles p
            JOIN user_profile_managers m ON m.profile_id = p.id
            JOIN users a ON a.id = m.admin_id
            WHERE p.user_id = $1
            ORDER BY a.username
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// IDs of the admins managing a user
    pub async fn manager_ids(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT m.admin_id
            FROM user_profiles p
            JOIN user_profile_managers m ON m.profile_id = p.id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Adds `admin_id` to the user's managers
    ///
    /// Creates the profile if needed. Adding an existing edge is a no-op.
    pub async fn add_manager(pool: &PgPool, user_id: Uuid, admin_id: Uuid) -> Result<(), sqlx::Error> {
        let profile = Self::get_or_create(pool, user_id).await?;

        sqlx::query(
            r#"
            INSERT INTO user_profile_managers (profile_id, admin_id)
            VALUES ($1, $2)
            ON CONFLICT (profile_id, admin_id) DO NOTHING
            "#,
        )
        .bind(profile.id)
        .bind(admin_id)
        .execute(pool)
        .await?;

        tracing::info!(user_id = %user_id, admin_id = %admin_id, "User assigned to admin");

        Ok(())
    }

    /// Removes `admin_id` from the user's managers
    ///
    /// # Returns
    ///
    /// True if an edge was removed
    pub async fn remove_manager(pool: &PgPool, user_id: Uuid, admin_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM user_profile_managers m
            USING user_profiles p
            WHERE m.profile_id = p.id AND p.user_id = $1 AND m.admin_id = $2
            "#,
        )
        .bind(user_id)
        .bind(admin_id)
        .execute(pool)
        .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            tracing::info!(user_id = %user_id, admin_id = %admin_id, "User unassigned from admin");
        }

        Ok(removed)
    }

    /// Users managed by an admin, by username
    pub async fn managed_users(pool: &PgPool, admin_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.is_superuser,
                   u.created_at, u.updated_at, u.last_login_at
            FROM users u
            JOIN user_profiles p ON p.user_id = u.id
            JOIN user_profile_managers m ON m.profile_id = p.id
            WHERE m.admin_id = $1
            ORDER BY u.username
            "#,
        )
        .bind(admin_id)
        .fetch_all(pool)
        .await
    }

    /// Every user with at least one managing admin, with those admins
    pub async fn list_assignments(pool: &PgPool) -> Result<Vec<Assignment>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.is_superuser,
                   u.created_at, u.updated_at, u.last_login_at,
                   a.id AS admin_id, a.username AS admin_username, a.email AS admin_email,
                   a.password_hash AS admin_password_hash,
                   a.is_superuser AS admin_is_superuser,
                   a.created_at AS admin_created_at, a.updated_at AS admin_updated_at,
                   a.last_login_at AS admin_last_login_at
            FROM users u
            JOIN user_profiles p ON p.user_id = u.id
            JOIN user_profile_managers m ON m.profile_id = p.id
            JOIN users a ON a.id = m.admin_id
            ORDER BY u.username, u.id, a.username
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(fold_assignments(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: String::new(),
            password_hash: String::new(),
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn row(user: &User, admin: &User) -> AssignmentRow {
        AssignmentRow {
            user: user.clone(),
            admin_id: admin.id,
            admin_username: admin.username.clone(),
            admin_email: admin.email.clone(),
            admin_password_hash: admin.password_hash.clone(),
            admin_is_superuser: admin.is_superuser,
            admin_created_at: admin.created_at,
            admin_updated_at: admin.updated_at,
            admin_last_login_at: admin.last_login_at,
        }
    }

    #[test]
    fn test_fold_assignments_groups_by_user() {
        let alice = user("alice");
        let bob = user("bob");
        let root = user("root");
        let sam = user("sam");

        let folded = fold_assignments(vec![
            row(&alice, &root),
            row(&alice, &sam),
            row(&bob, &sam),
        ]);

        assert_eq!(folded.len(), 2);
        assert_eq!(folded[0].user.username, "alice");
        assert_eq!(
            folded[0].admins.iter().map(|a| a.username.as_str()).collect::<Vec<_>>(),
            vec!["root", "sam"]
        );
        assert_eq!(folded[1].user.username, "bob");
        assert_eq!(folded[1].admins.len(), 1);
        assert_eq!(folded[1].admins[0].id, sam.id);
    }

    #[test]
    fn test_fold_assignments_empty() {
        assert!(fold_assignments(Vec::new()).is_empty());
    }
}
