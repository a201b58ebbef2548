//! # Taskgate Server
//!
//! Serves the task tracker's HTML pages and its JSON API.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment (`.env` is honored)
//! 2. Connect to PostgreSQL and apply migrations
//! 3. Create or flag the bootstrap SuperAdmin, when configured
//! 4. Serve until Ctrl-C
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/taskgate JWT_SECRET=... cargo run -p taskgate-api
//! ```

use anyhow::Context;
use sqlx::PgPool;
use taskgate_api::{
    app::{build_router, AppState},
    config::{BootstrapConfig, Config},
};
use taskgate_shared::{
    auth::password::hash_password,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    models::user::User,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskgate_api=debug,taskgate_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Taskgate server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    run_migrations(&pool).await.context("Failed to run migrations")?;

    if let Some(bootstrap) = &config.bootstrap {
        bootstrap_superadmin(&pool, bootstrap).await?;
    }

    let address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config)?);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn bootstrap_superadmin(pool: &PgPool, bootstrap: &BootstrapConfig) -> anyhow::Result<()> {
    let password_hash = hash_password(&bootstrap.password)?;
    let (user, created) =
        User::ensure_superadmin(pool, &bootstrap.username, &bootstrap.email, password_hash).await?;

    if created {
        tracing::info!(user_id = %user.id, username = %user.username, "Created bootstrap SuperAdmin");
    } else {
        tracing::info!(user_id = %user.id, username = %user.username, "Bootstrap SuperAdmin already present");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
