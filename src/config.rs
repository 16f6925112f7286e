//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8000)
    pub port: u16,
    /// Public domain (e.g., "buddy.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://buddy.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Uploaded image storage
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded images are written to and served from
    pub uploads_dir: PathBuf,
    /// Maximum accepted image size in bytes (default: 5 MiB)
    pub max_upload_bytes: usize,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for bearer tokens (32+ bytes)
    pub token_secret: String,
    /// Token lifetime in seconds (default: 604800 = 7 days)
    pub token_max_age: i64,
    /// bcrypt cost for password hashes
    pub password_hash_cost: u32,
    pub google: GoogleAuthConfig,
}

/// Google Sign-In configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleAuthConfig {
    /// OAuth client ID; ID tokens must carry it as audience
    #[serde(default)]
    pub client_id: String,
    /// JWKS endpoint with Google's signing keys
    pub jwks_url: String,
    /// Seconds a fetched key set stays cached
    pub jwks_cache_ttl: u64,
}

/// Feed pagination configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Page size when the client sends no `limit` (default: 10)
    pub default_page_size: u32,
    /// Upper bound for `limit` (default: 50)
    pub max_page_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (BUDDYSCRIPT__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8000)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/buddyscript.db")?
            .set_default("storage.uploads_dir", "uploads")?
            .set_default("storage.max_upload_bytes", 5 * 1024 * 1024)?
            .set_default("auth.token_max_age", 604800)?
            .set_default("auth.password_hash_cost", 10)?
            .set_default(
                "auth.google.jwks_url",
                "https://www.googleapis.com/oauth2/v3/certs",
            )?
            .set_default("auth.google.jwks_cache_ttl", 3600)?
            .set_default("feed.default_page_size", 10)?
            .set_default("feed.max_page_size", 50)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("BUDDYSCRIPT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn is_local_server(&self) -> bool {
        is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_TOKEN_SECRET_BYTES: usize = 32;

        if self.auth.token_secret.len() < MIN_TOKEN_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.token_secret must be at least {} bytes",
                MIN_TOKEN_SECRET_BYTES
            )));
        }

        if self.auth.token_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.token_max_age must be greater than 0".to_string(),
            ));
        }

        if !(4..=31).contains(&self.auth.password_hash_cost) {
            return Err(crate::error::AppError::Config(
                "auth.password_hash_cost must be between 4 and 31".to_string(),
            ));
        }

        if self.feed.default_page_size == 0
            || self.feed.default_page_size > self.feed.max_page_size
        {
            return Err(crate::error::AppError::Config(
                "feed.default_page_size must be between 1 and feed.max_page_size".to_string(),
            ));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(crate::error::AppError::Config(
                "storage.max_upload_bytes must be greater than 0".to_string(),
            ));
        }

        if self.auth.google.client_id.trim().is_empty() {
            tracing::warn!("auth.google.client_id is not set; Google sign-in will reject all tokens");
        }

        if !self.is_local_server() && !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/buddyscript-test.db"),
            },
            storage: StorageConfig {
                uploads_dir: PathBuf::from("/tmp/buddyscript-uploads"),
                max_upload_bytes: 5 * 1024 * 1024,
            },
            auth: AuthConfig {
                token_secret: "x".repeat(32),
                token_max_age: 604_800,
                password_hash_cost: 4,
                google: GoogleAuthConfig {
                    client_id: "google-client-id".to_string(),
                    jwks_url: "https://www.googleapis.com/oauth2/v3/certs".to_string(),
                    jwks_cache_ttl: 3600,
                },
            },
            feed: FeedConfig {
                default_page_size: 10,
                max_page_size: 50,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(config.is_local_server());
    }

    #[test]
    fn validate_rejects_short_token_secret() {
        let mut config = valid_config();
        config.auth.token_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("token secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.token_secret")
        ));
    }

    #[test]
    fn validate_rejects_default_page_size_above_max() {
        let mut config = valid_config();
        config.feed.default_page_size = 100;

        let error = config.validate().expect_err("default above max must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("feed.default_page_size")
        ));
    }

    #[test]
    fn validate_rejects_http_for_non_local_domain() {
        let mut config = valid_config();
        config.server.domain = "buddy.example.com".to_string();

        let error = config
            .validate()
            .expect_err("public domains must require https");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("server.protocol must be https")
        ));
    }
}
