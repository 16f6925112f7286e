//! Google Sign-In ID token verification
//!
//! Verifies RS256 ID tokens against Google's published signing keys.
//! Keys are cached for `auth.google.jwks_cache_ttl` seconds and refetched
//! early when a token names an unknown key id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::pkcs1v15::{Signature as Pkcs1v15Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use serde::Deserialize;
use sha2::Sha256;
use tokio::sync::RwLock;

use crate::config::GoogleAuthConfig;
use crate::error::AppError;
use crate::metrics::GOOGLE_KEY_FETCHES_TOTAL;

/// Issuers Google uses for ID tokens
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Identity asserted by a verified Google ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    /// Stable Google account id (`sub`)
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

/// Verifies third-party ID tokens
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    /// Verify an ID token and return the identity it asserts
    ///
    /// # Errors
    /// `Unauthorized` if the token is malformed, badly signed, expired or
    /// issued for another client
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AppError>;
}

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
    kid: Option<String>,
}

/// `email_verified` arrives as a bool or as the string "true"
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BoolOrString {
    Bool(bool),
    String(String),
}

impl BoolOrString {
    fn as_bool(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::String(value) => value.eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    iss: String,
    aud: String,
    exp: i64,
    sub: String,
    email: Option<String>,
    email_verified: Option<BoolOrString>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: String,
    e: String,
}

/// Fetched key set
#[derive(Debug, Clone)]
struct CachedKeys {
    keys: HashMap<String, RsaPublicKey>,
    fetched_at: Instant,
}

impl CachedKeys {
    fn is_valid(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Google ID token verifier with a TTL key cache
pub struct GoogleVerifier {
    http_client: Arc<reqwest::Client>,
    jwks_url: String,
    client_id: String,
    ttl: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl GoogleVerifier {
    /// Create new verifier
    ///
    /// # Arguments
    /// * `http_client` - HTTP client for fetching keys
    /// * `config` - Client id, key set URL and cache TTL
    pub fn new(http_client: Arc<reqwest::Client>, config: &GoogleAuthConfig) -> Self {
        Self {
            http_client,
            jwks_url: config.jwks_url.clone(),
            client_id: config.client_id.clone(),
            ttl: Duration::from_secs(config.jwks_cache_ttl),
            cache: RwLock::new(None),
        }
    }

    /// Get the signing key for a key id
    ///
    /// Checks cache first, fetches the key set if not cached, expired, or
    /// missing the requested key.
    async fn key(&self, kid: &str) -> Result<RsaPublicKey, AppError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid(self.ttl) {
                    if let Some(key) = cached.keys.get(kid) {
                        tracing::debug!(kid, "Google key cache hit");
                        return Ok(key.clone());
                    }
                }
            }
        }

        tracing::debug!(kid, "Google key cache miss, fetching key set");
        let keys = match self.fetch_keys().await {
            Ok(keys) => {
                GOOGLE_KEY_FETCHES_TOTAL.with_label_values(&["success"]).inc();
                keys
            }
            Err(error) => {
                GOOGLE_KEY_FETCHES_TOTAL.with_label_values(&["error"]).inc();
                return Err(error);
            }
        };

        let key = keys.get(kid).cloned();
        {
            let mut cache = self.cache.write().await;
            *cache = Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            });
        }

        key.ok_or_else(|| {
            tracing::warn!(kid, "ID token signed with unknown key");
            AppError::Unauthorized
        })
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, RsaPublicKey>, AppError> {
        let jwks: Jwks = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            match rsa_key_from_jwk(&jwk) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(error) => tracing::warn!(kid = %jwk.kid, %error, "Skipping unusable key"),
            }
        }

        tracing::info!(count = keys.len(), "Fetched Google signing keys");
        Ok(keys)
    }

    #[cfg(test)]
    async fn preload(&self, keys: HashMap<String, RsaPublicKey>) {
        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });
    }
}

fn rsa_key_from_jwk(jwk: &Jwk) -> Result<RsaPublicKey, AppError> {
    let n = URL_SAFE_NO_PAD
        .decode(&jwk.n)
        .map_err(|e| AppError::Encryption(format!("Invalid key modulus: {}", e)))?;
    let e = URL_SAFE_NO_PAD
        .decode(&jwk.e)
        .map_err(|e| AppError::Encryption(format!("Invalid key exponent: {}", e)))?;

    RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
        .map_err(|e| AppError::Encryption(format!("Invalid RSA key: {}", e)))
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> Result<T, AppError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AppError::Unauthorized)?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::Unauthorized)
}

#[async_trait]
impl IdTokenVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AppError> {
        if self.client_id.is_empty() {
            tracing::warn!("Google sign-in attempted without auth.google.client_id");
            return Err(AppError::Unauthorized);
        }

        let mut segments = id_token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AppError::Unauthorized);
        };

        let header: JwtHeader = decode_segment(header_b64)?;
        if header.alg != "RS256" {
            return Err(AppError::Unauthorized);
        }
        let kid = header.kid.ok_or(AppError::Unauthorized)?;

        let key = self.key(&kid).await?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AppError::Unauthorized)?;
        let signature = Pkcs1v15Signature::try_from(signature_bytes.as_slice())
            .map_err(|_| AppError::Unauthorized)?;
        let signed = &id_token[..header_b64.len() + 1 + payload_b64.len()];
        VerifyingKey::<Sha256>::new(key)
            .verify(signed.as_bytes(), &signature)
            .map_err(|_| AppError::Unauthorized)?;

        let claims: GoogleClaims = decode_segment(payload_b64)?;
        if !GOOGLE_ISSUERS.contains(&claims.iss.as_str()) {
            return Err(AppError::Unauthorized);
        }
        if claims.aud != self.client_id {
            return Err(AppError::Unauthorized);
        }
        if claims.exp <= chrono::Utc::now().timestamp() {
            return Err(AppError::Unauthorized);
        }
        let email = claims
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or(AppError::Unauthorized)?;
        if claims.sub.is_empty() {
            return Err(AppError::Unauthorized);
        }

        Ok(GoogleIdentity {
            subject: claims.sub,
            email,
            email_verified: claims
                .email_verified
                .map(|value| value.as_bool())
                .unwrap_or(false),
            given_name: claims.given_name,
            family_name: claims.family_name,
            picture: claims.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;
    use rsa::pkcs1v15::SigningKey;
    use rsa::signature::{SignatureEncoding, Signer};
    use std::sync::OnceLock;

    const CLIENT_ID: &str = "client-123.apps.googleusercontent.com";

    fn test_key() -> &'static RsaPrivateKey {
        static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| {
            RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("generate test key")
        })
    }

    fn sign(header: serde_json::Value, claims: serde_json::Value) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let signing_input = format!("{header_b64}.{payload_b64}");

        let signing_key = SigningKey::<Sha256>::new(test_key().clone());
        let signature = signing_key.sign(signing_input.as_bytes());
        format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }

    fn claims(overrides: serde_json::Value) -> serde_json::Value {
        let mut claims = serde_json::json!({
            "iss": "https://accounts.google.com",
            "aud": CLIENT_ID,
            "exp": chrono::Utc::now().timestamp() + 600,
            "sub": "1098765",
            "email": "jane@example.com",
            "email_verified": true,
            "given_name": "Jane",
            "family_name": "Doe",
            "picture": "https://lh3.googleusercontent.com/a/jane"
        });
        if let (Some(base), Some(extra)) = (claims.as_object_mut(), overrides.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        claims
    }

    async fn verifier() -> GoogleVerifier {
        let config = GoogleAuthConfig {
            client_id: CLIENT_ID.to_string(),
            // Unroutable; tests never fetch
            jwks_url: "http://127.0.0.1:9/certs".to_string(),
            jwks_cache_ttl: 3600,
        };
        let verifier = GoogleVerifier::new(Arc::new(reqwest::Client::new()), &config);
        let mut keys = HashMap::new();
        keys.insert("kid-1".to_string(), test_key().to_public_key());
        verifier.preload(keys).await;
        verifier
    }

    fn header() -> serde_json::Value {
        serde_json::json!({ "alg": "RS256", "kid": "kid-1", "typ": "JWT" })
    }

    #[tokio::test]
    async fn valid_token_yields_identity() {
        let verifier = verifier().await;
        let token = sign(header(), claims(serde_json::json!({})));

        let identity = verifier.verify(&token).await.unwrap();
        assert_eq!(identity.subject, "1098765");
        assert_eq!(identity.email, "jane@example.com");
        assert!(identity.email_verified);
        assert_eq!(identity.given_name.as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn claim_checks_reject_bad_tokens() {
        let verifier = verifier().await;

        let cases = [
            claims(serde_json::json!({ "aud": "someone-else" })),
            claims(serde_json::json!({ "iss": "https://evil.example" })),
            claims(serde_json::json!({ "exp": chrono::Utc::now().timestamp() - 5 })),
            claims(serde_json::json!({ "email": "" })),
        ];
        for case in cases {
            let token = sign(header(), case);
            assert!(matches!(
                verifier.verify(&token).await,
                Err(AppError::Unauthorized)
            ));
        }
    }

    #[tokio::test]
    async fn tampered_or_malformed_tokens_are_rejected() {
        let verifier = verifier().await;
        let token = sign(header(), claims(serde_json::json!({})));

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims(serde_json::json!({ "sub": "x" }))).unwrap());
        parts[1] = &forged_payload;
        assert!(verifier.verify(&parts.join(".")).await.is_err());

        assert!(verifier.verify("not-a-jwt").await.is_err());

        let hs256 = sign(
            serde_json::json!({ "alg": "HS256", "kid": "kid-1" }),
            claims(serde_json::json!({})),
        );
        assert!(verifier.verify(&hs256).await.is_err());
    }

    #[test]
    fn email_verified_accepts_string_form() {
        assert!(BoolOrString::String("true".to_string()).as_bool());
        assert!(!BoolOrString::String("false".to_string()).as_bool());
        assert!(BoolOrString::Bool(true).as_bool());
    }
}
