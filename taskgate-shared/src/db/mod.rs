//! Database layer
//!
//! - `pool`: PostgreSQL connection pool with a health check
//! - `migrations`: embedded sqlx migrations from the workspace `migrations/` directory
//!
//! Models live in [`crate::models`].
//!
//! # Example
//!
//! ```no_run
//! use taskgate_shared::db::migrations::run_migrations;
//! use taskgate_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(DatabaseConfig {
//!         url: std::env::var("DATABASE_URL")?,
//!         ..Default::default()
//!     })
//!     .await?;
//!
//!     run_migrations(&pool).await?;
//!     Ok(())
//! }
//! ```

pub mod migrations;
pub mod pool;
