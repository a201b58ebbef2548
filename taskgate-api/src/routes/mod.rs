//! JSON API route handlers
//!
//! - `health`: health check
//! - `token`: obtain and refresh JWTs
//! - `tasks`: the caller's own tasks and task reports

pub mod health;
pub mod tasks;
pub mod token;
