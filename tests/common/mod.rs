//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use buddyscript::api::dto::{RegisterRequest, UserResponse};
use buddyscript::auth::{GoogleIdentity, IdTokenVerifier};
use buddyscript::client::{ApiClient, ImageFile};
use buddyscript::error::AppError;
use buddyscript::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const PASSWORD: &str = "correct horse battery";

/// Accepts tokens shaped `google:{subject}:{email}:{given name}`
pub struct StubGoogleVerifier;

#[async_trait]
impl IdTokenVerifier for StubGoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AppError> {
        let mut parts = id_token.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("google"), Some(subject), Some(email), given_name) => Ok(GoogleIdentity {
                subject: subject.to_string(),
                email: email.to_string(),
                email_verified: true,
                given_name: given_name.map(str::to_string),
                family_name: Some("Google".to_string()),
                picture: None,
            }),
            _ => Err(AppError::Unauthorized),
        }
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A registered user with a signed-in API client
pub struct TestUser {
    pub api: ApiClient,
    pub user: UserResponse,
    pub token: String,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: config::DatabaseConfig {
                path: temp_dir.path().join("test.db"),
            },
            storage: config::StorageConfig {
                uploads_dir: temp_dir.path().join("uploads"),
                max_upload_bytes: 64 * 1024,
            },
            auth: config::AuthConfig {
                token_secret: "test-secret-key-that-is-32-bytes!".to_string(),
                token_max_age: 3600,
                password_hash_cost: 4,
                google: config::GoogleAuthConfig {
                    client_id: "test-client-id".to_string(),
                    jwks_url: "http://127.0.0.1:9/certs".to_string(),
                    jwks_cache_ttl: 3600,
                },
            },
            feed: config::FeedConfig {
                default_page_size: 10,
                max_page_size: 50,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        buddyscript::metrics::init_metrics();
        let state = AppState::with_verifier(config, Arc::new(StubGoogleVerifier))
            .await
            .unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let app = buddyscript::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Unauthenticated API client
    pub fn api_client(&self) -> ApiClient {
        ApiClient::with_http_client(self.client.clone(), self.addr.clone())
    }

    /// Register a fresh user with a unique email
    pub async fn sign_up(&self, first_name: &str) -> TestUser {
        let mut api = self.api_client();
        let email = format!(
            "{}-{}@example.com",
            first_name.to_lowercase(),
            ulid::Ulid::new().to_string().to_lowercase()
        );
        let auth = api
            .register(&RegisterRequest {
                first_name: first_name.to_string(),
                last_name: "Tester".to_string(),
                email,
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap();

        TestUser {
            api,
            user: auth.user,
            token: auth.token,
        }
    }
}

/// Smallest valid PNG header, enough for the upload checks
pub fn png_image() -> ImageFile {
    ImageFile {
        file_name: "photo.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0],
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
