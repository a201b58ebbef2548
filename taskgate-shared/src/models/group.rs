//! Role groups and group membership
//!
//! Every account belongs to a set of groups. The three groups are a closed
//! enum, so they never need bootstrapping. By convention an account sits in
//! exactly one of them, but the schema does not enforce that.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE user_group AS ENUM ('user', 'admin', 'superadmin');
//!
//! CREATE TABLE user_groups (
//!     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
//!     group_name user_group NOT NULL,
//!     PRIMARY KEY (user_id, group_name)
//! );
//! ```
//!
//! # Promotion
//!
//! [`GroupMembership::promote`] moves an account from User to Admin and
//! [`GroupMembership::demote`] moves it back. Each runs in one transaction, so
//! promoting then demoting leaves the account in the User group only.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::fmt;
use uuid::Uuid;

/// Role group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_group", rename_all = "lowercase")]
pub enum Group {
    /// Works on their own tasks
    User,

    /// Manages the tasks of assigned users
    Admin,

    /// Manages users, admins and assignments
    #[serde(rename = "SuperAdmin")]
    SuperAdmin,
}

impl Group {
    /// Display name
    pub fn as_str(&self) -> &'static str {
        match self {
            Group::User => "User",
            Group::Admin => "Admin",
            Group::SuperAdmin => "SuperAdmin",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group membership operations
pub struct GroupMembership;

impl GroupMembership {
    /// Lists the groups an account belongs to
    pub async fn groups_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Group>, sqlx::Error> {
        let groups = sqlx::query_scalar::<_, Group>(
            "SELECT group_name FROM user_groups WHERE user_id = $1 ORDER BY group_name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(groups)
    }

    /// Adds an account to a group (no-op if already a member)
    pub async fn add(conn: &mut PgConnection, user_id: Uuid, group: Group) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO user_groups (user_id, group_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id, group_name) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(group)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Removes an account from a group (no-op if not a member)
    pub async fn remove(conn: &mut PgConnection, user_id: Uuid, group: Group) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_name = $2")
            .bind(user_id)
            .bind(group)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Moves an account from the User group to the Admin group
    pub async fn promote(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
        Self::swap(pool, user_id, Group::User, Group::Admin).await?;
        tracing::info!(user_id = %user_id, "User promoted to admin");
        Ok(())
    }

    /// Moves an account from the Admin group to the User group
    pub async fn demote(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
        Self::swap(pool, user_id, Group::Admin, Group::User).await?;
        tracing::info!(user_id = %user_id, "Admin demoted to user");
        Ok(())
    }

    async fn swap(pool: &PgPool, user_id: Uuid, from: Group, to: Group) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        Self::remove(&mut tx, user_id, from).await?;
        Self::add(&mut tx, user_id, to).await?;
        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_display() {
        assert_eq!(Group::User.to_string(), "User");
        assert_eq!(Group::Admin.to_string(), "Admin");
        assert_eq!(Group::SuperAdmin.to_string(), "SuperAdmin");
    }

    #[test]
    fn test_group_serialization() {
        assert_eq!(serde_json::to_string(&Group::SuperAdmin).unwrap(), "\"SuperAdmin\"");
        assert_eq!(serde_json::to_string(&Group::Admin).unwrap(), "\"Admin\"");
    }

    #[test]
    fn test_group_ordering() {
        assert!(Group::User < Group::Admin);
        assert!(Group::Admin < Group::SuperAdmin);
    }
}
