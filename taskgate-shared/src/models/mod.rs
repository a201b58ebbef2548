//! Database models
//!
//! Each model pairs a `sqlx::FromRow` struct with async CRUD functions that
//! take a `&PgPool`.
//!
//! - `user`: accounts and password hashes
//! - `group`: User / Admin / SuperAdmin membership, promote and demote
//! - `profile`: user profiles and the Admin→User management edges
//! - `task`: tasks, lifecycle fields and visibility scopes

pub mod group;
pub mod profile;
pub mod task;
pub mod user;
