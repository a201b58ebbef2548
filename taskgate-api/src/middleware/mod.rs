//! Middleware for the server
//!
//! - [`security`]: OWASP response headers
//! - [`session`]: cookie sessions for the HTML pages
//!
//! Bearer-token authentication for the JSON API lives in
//! [`app`](crate::app) next to the router.

pub mod security;
pub mod session;
