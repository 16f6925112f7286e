//! BuddyScript - a small social network backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /api/auth, /api/posts, /api/comments, /api/health        │
//! │  - /uploads static files, /metrics                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Reactions, feed paging, comments and replies, accounts   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - Local disk image storage                                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `auth`: bearer tokens, auth middleware, Google ID tokens
//! - `client`: HTTP client and optimistic reaction controller
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `storage`: Uploaded image storage
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use auth::IdTokenVerifier;

/// Request body ceiling on top of the image limit, for the other form fields
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across all handlers
///
/// Cloned for each request; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Uploaded image storage
    pub storage: Arc<storage::MediaStorage>,

    /// Google ID token verifier
    pub google: Arc<dyn IdTokenVerifier>,

    /// Outbound HTTP client (Google key set fetches)
    pub http_client: Arc<reqwest::Client>,

    started_at: Instant,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite and run migrations
    /// 2. Prepare the uploads directory
    /// 3. Build the HTTP client and Google verifier
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let http_client = Arc::new(build_http_client()?);
        let google = Arc::new(auth::GoogleVerifier::new(
            http_client.clone(),
            &config.auth.google,
        ));
        Self::build(config, http_client, google).await
    }

    /// Initialize application state with a custom ID token verifier
    pub async fn with_verifier(
        config: config::AppConfig,
        google: Arc<dyn IdTokenVerifier>,
    ) -> Result<Self, error::AppError> {
        let http_client = Arc::new(build_http_client()?);
        Self::build(config, http_client, google).await
    }

    async fn build(
        config: config::AppConfig,
        http_client: Arc<reqwest::Client>,
        google: Arc<dyn IdTokenVerifier>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        let storage = storage::MediaStorage::new(&config.storage).await?;
        tracing::info!(
            uploads_dir = %storage.root().display(),
            "Media storage initialized"
        );

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            storage: Arc::new(storage),
            google,
            http_client,
            started_at: Instant::now(),
        })
    }

    /// Time since the state was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

fn build_http_client() -> Result<reqwest::Client, error::AppError> {
    reqwest::Client::builder()
        .user_agent(concat!("BuddyScript/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| error::AppError::Internal(e.into()))
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit};
    use tower_http::{
        catch_panic::CatchPanicLayer, compression::CompressionLayer, services::ServeDir,
        trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);
    let body_limit = state.storage.max_bytes() + FORM_OVERHEAD_BYTES;
    let uploads = ServeDir::new(state.storage.root());

    Router::new()
        .nest("/api", api::api_router(state.clone()))
        .nest_service(storage::UPLOADS_URL_PREFIX, uploads)
        .merge(api::metrics_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

fn panic_response(_panic: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    use axum::response::IntoResponse;

    error::AppError::Internal(anyhow::anyhow!("handler panicked")).into_response()
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}
