//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use taskgate_api::{app::{build_router, AppState}, config::Config};
//! use sqlx::PgPool;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = PgPool::connect(&config.database.url).await?;
//! let app = build_router(AppState::new(pool, config)?);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{security::SecurityHeadersLayer, session::session_auth_layer},
    routes, web,
    web::templates::Templates,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskgate_shared::auth::{jwt, principal::Principal};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned per handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    /// Compiled page templates
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Creates application state and compiles the page templates
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let templates = Templates::new()
            .map_err(|e| anyhow::anyhow!("Failed to compile templates: {:?}", e))?;

        Ok(Self {
            db,
            config: Arc::new(config),
            templates: Arc::new(templates),
        })
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
///
/// # Layout
///
/// ```text
/// /health                      public
/// /api/token/                  public, POST username/password
/// /api/token/refresh/          public, POST refresh token
/// /tasks/ ...                  JSON API, Bearer access token
/// /, /accounts/login/, /accounts/logout/   public pages
/// everything else              pages, session cookie
/// ```
///
/// # Middleware Stack
///
/// Applied outermost first: security headers, CORS, request tracing, then
/// per-group authentication.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/token/", post(routes::token::obtain_token))
        .route("/api/token/refresh/", post(routes::token::refresh_token))
        .merge(web::public_routes());

    let api_routes = Router::new()
        .route("/tasks/", get(routes::tasks::list_own_tasks))
        .route(
            "/tasks/:id/",
            axum::routing::put(routes::tasks::update_own_task).patch(routes::tasks::update_own_task),
        )
        .route("/tasks/:id/report/", get(routes::tasks::task_report))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let page_routes = web::protected_routes()
        .route_layer(from_fn_with_state(state.clone(), session_auth_layer));

    let cors = if state.config.cors_permissive() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(page_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer authentication for the JSON API
///
/// Validates the access token and loads the caller's [`Principal`] into
/// request extensions. Session and refresh tokens are rejected here.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ApiError::Unauthorized("Authentication credentials were not provided.".to_string())
        })?
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    let principal = Principal::load(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".to_string()))?;

    tracing::debug!(user_id = %principal.user_id, "API request authenticated");

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
