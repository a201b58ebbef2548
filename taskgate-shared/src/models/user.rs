//! User accounts
//!
//! A user is an identity with an Argon2id password hash and a superuser flag.
//! Roles live in [`user_groups`](super::group), not on this row.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     username VARCHAR(150) NOT NULL UNIQUE,
//!     email VARCHAR(254) NOT NULL DEFAULT '',
//!     password_hash VARCHAR(255) NOT NULL,
//!     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     last_login_at TIMESTAMPTZ
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use taskgate_shared::models::group::Group;
//! use taskgate_shared::models::user::{CreateUser, User};
//!
//! # async fn example(pool: sqlx::PgPool) -> Result<(), sqlx::Error> {
//! let user = User::create_with_group(&pool, CreateUser {
//!     username: "alice".to_string(),
//!     email: "alice@example.com".to_string(),
//!     password_hash: "$argon2id$...".to_string(),
//!     is_superuser: false,
//! }, Group::User).await?;
//!
//! let found = User::find_by_username(&pool, "alice").await?;
//! assert_eq!(found.map(|u| u.id), Some(user.id));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::group::{Group, GroupMembership};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Optional contact address (empty string when unset)
    pub email: String,

    /// Argon2id PHC string, never exposed in JSON
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Superuser accounts can never be deleted through the app
    pub is_superuser: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// User with the groups they belong to, for the user management listing
#[derive(Debug, Clone, Serialize)]
pub struct UserWithGroups {
    #[serde(flatten)]
    pub user: User,
    pub groups: Vec<Group>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    /// Already hashed
    pub password_hash: String,
    pub is_superuser: bool,
}

/// Input for updating a user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, is_superuser, created_at, updated_at, last_login_at";

impl User {
    /// Creates a user without any group
    ///
    /// # Errors
    ///
    /// Returns a database error with a unique violation if the username is taken
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, is_superuser)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.is_superuser)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Creates a user and adds them to `group` in one transaction
    ///
    /// This is how the user and admin creation forms persist new accounts.
    pub async fn create_with_group(
        pool: &PgPool,
        data: CreateUser,
        group: Group,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, is_superuser)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.is_superuser)
        .fetch_one(&mut *tx)
        .await?;

        GroupMembership::add(&mut tx, user.id, group).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, username = %user.username, group = %group, "User created");

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by exact username
    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Checks whether a username is taken, optionally ignoring one account
    ///
    /// The update forms pass the edited account as `except` so keeping the
    /// current username is not reported as a duplicate.
    pub async fn username_taken(
        pool: &PgPool,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND id IS DISTINCT FROM $2)",
        )
        .bind(username)
        .bind(except)
        .fetch_one(pool)
        .await
    }

    /// Updates the `Some` fields of a user
    ///
    /// # Returns
    ///
    /// The updated user, or None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = sqlx::QueryBuilder::<sqlx::Postgres>::new("UPDATE users SET updated_at = NOW()");

        if let Some(username) = data.username {
            query.push(", username = ").push_bind(username);
        }
        if let Some(email) = data.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            query.push(", password_hash = ").push_bind(password_hash);
        }

        query
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(USER_COLUMNS);

        query.build_query_as::<User>().fetch_optional(pool).await
    }

    /// Deletes a user, cascading to groups, profile, management edges and tasks
    ///
    /// Callers must run the account-deletion policy check first.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists every user, by username
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))
            .fetch_all(pool)
            .await
    }

    /// Lists every user with their groups, by username
    pub async fn list_with_groups(pool: &PgPool) -> Result<Vec<UserWithGroups>, sqlx::Error> {
        let users = Self::list(pool).await?;

        let rows = sqlx::query_as::<_, (Uuid, Group)>(
            "SELECT user_id, group_name FROM user_groups ORDER BY group_name",
        )
        .fetch_all(pool)
        .await?;

        let mut groups: HashMap<Uuid, Vec<Group>> = HashMap::new();
        for (user_id, group) in rows {
            groups.entry(user_id).or_default().push(group);
        }

        Ok(users
            .into_iter()
            .map(|user| UserWithGroups {
                groups: groups.remove(&user.id).unwrap_or_default(),
                user,
            })
            .collect())
    }

    /// Lists the members of a group, by username
    pub async fn list_in_group(pool: &PgPool, group: Group) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.username, u.email, u.password_hash, u.is_superuser,
                   u.created_at, u.updated_at, u.last_login_at
            FROM users u
            JOIN user_groups g ON g.user_id = u.id
            WHERE g.group_name = $1
            ORDER BY u.username
            "#,
        )
        .bind(group)
        .fetch_all(pool)
        .await
    }

    /// Makes sure a superuser account exists with the SuperAdmin group
    ///
    /// If `username` is new the account is created with `password_hash`.
    /// An existing account is flagged superuser and added to SuperAdmin, but
    /// its password is left alone.
    ///
    /// # Returns
    ///
    /// The account and whether it was newly created
    pub async fn ensure_superadmin(
        pool: &PgPool,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<(Self, bool), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET is_superuser = TRUE, updated_at = NOW()
            WHERE username = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .fetch_optional(&mut *tx)
        .await?;

        let (user, created) = match existing {
            Some(user) => (user, false),
            None => {
                let user = sqlx::query_as::<_, User>(&format!(
                    r#"
                    INSERT INTO users (username, email, password_hash, is_superuser)
                    VALUES ($1, $2, $3, TRUE)
                    RETURNING {USER_COLUMNS}
                    "#
                ))
                .bind(username)
                .bind(email)
                .bind(password_hash)
                .fetch_one(&mut *tx)
                .await?;
                (user, true)
            }
        };

        GroupMembership::add(&mut tx, user.id, Group::SuperAdmin).await?;
        tx.commit().await?;

        Ok((user, created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.username.is_none());
        assert!(update.email.is_none());
        assert!(update.password_hash.is_none());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: String::new(),
            password_hash: "$argon2id$secret".to_string(),
            is_superuser: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["username"], "alice");
        assert!(json.get("password_hash").is_none());
    }
}
