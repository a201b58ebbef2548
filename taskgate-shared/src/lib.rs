//! # TaskGate shared library
//!
//! Data layer and business rules used by the TaskGate server.
//!
//! ## Module Organization
//!
//! - `models`: users, groups, profiles and tasks (sqlx)
//! - `db`: connection pool and migrations
//! - `auth`: passwords, JWTs, the request principal and the authorization policy
//! - `lifecycle`: task status validation

pub mod auth;
pub mod db;
pub mod lifecycle;
pub mod models;

/// Current version of the TaskGate shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
