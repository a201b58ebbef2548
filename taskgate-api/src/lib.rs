//! # TaskGate Server Library
//!
//! Role-based task tracking over HTML pages and a JSON API.
//!
//! ## Modules
//!
//! - `app`: application state, router and API authentication
//! - `config`: configuration from the environment
//! - `error`: JSON API errors
//! - `middleware`: security headers and page sessions
//! - `routes`: JSON API handlers
//! - `web`: HTML page handlers, forms and templates

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod web;
