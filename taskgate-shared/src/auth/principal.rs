//! The authenticated caller as seen by the policy layer

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::group::{Group, GroupMembership};
use crate::models::user::User;

/// An authenticated user with their groups
///
/// Built from the database on every request by the auth middleware and
/// inserted into request extensions. Handlers pass it to
/// [`policy`](super::policy) functions.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub groups: Vec<Group>,
    pub is_superuser: bool,
}

impl Principal {
    pub fn new(user: &User, groups: Vec<Group>) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            groups,
            is_superuser: user.is_superuser,
        }
    }

    /// Loads a user and their groups
    ///
    /// # Returns
    ///
    /// None if the user no longer exists
    pub async fn load(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let Some(user) = User::find_by_id(pool, user_id).await? else {
            return Ok(None);
        };

        let groups = GroupMembership::groups_for_user(pool, user.id).await?;
        Ok(Some(Self::new(&user, groups)))
    }

    pub fn in_group(&self, group: Group) -> bool {
        self.groups.contains(&group)
    }

    pub fn is_superadmin(&self) -> bool {
        self.in_group(Group::SuperAdmin)
    }

    /// Admin or SuperAdmin
    pub fn is_staff(&self) -> bool {
        self.in_group(Group::Admin) || self.is_superadmin()
    }

    /// Highest group, for display
    pub fn role(&self) -> Option<Group> {
        self.groups.iter().copied().max()
    }
}
