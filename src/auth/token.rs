//! Bearer tokens
//!
//! Uses HMAC-signed tokens carrying the user id and expiry.
//! No server-side session storage needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user ID
    pub user_id: String,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
    /// When the token expires
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Claims for a user, valid for `max_age_secs` from now
    pub fn for_user(user_id: &str, max_age_secs: i64) -> Self {
        let issued_at = Utc::now();
        Self {
            user_id: user_id.to_string(),
            issued_at,
            expires_at: issued_at + Duration::seconds(max_age_secs),
        }
    }

    /// Check if token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Create a signed token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `claims` - Claims to encode
/// * `secret` - HMAC secret key
///
/// # Returns
/// Signed token string
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let payload = serde_json::to_string(claims).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a token
///
/// # Errors
/// Returns `Unauthorized` if the token is malformed, the signature does not
/// match, or the token has expired
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    use base64::{Engine as _, engine::general_purpose};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    if signature_b64.contains('.') {
        return Err(AppError::Unauthorized);
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Encryption(e.to_string()))?;
    mac.update(payload_b64.as_bytes());

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let claims: Claims =
        serde_json::from_slice(&payload_bytes).map_err(|_| AppError::Unauthorized)?;

    if claims.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn token_verifies_with_same_secret() {
        let claims = Claims::for_user("01HUSER", 3600);
        let token = create_token(&claims, SECRET).unwrap();

        let decoded = verify_token(&token, SECRET).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn token_rejected_with_other_secret() {
        let token = create_token(&Claims::for_user("01HUSER", 3600), SECRET).unwrap();
        let result = verify_token(&token, "another-secret-another-secret-xx");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn expired_token_rejected() {
        let token = create_token(&Claims::for_user("01HUSER", -10), SECRET).unwrap();
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn tampered_payload_rejected() {
        let token = create_token(&Claims::for_user("01HUSER", 3600), SECRET).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged = {
            use base64::{Engine as _, engine::general_purpose};
            let claims = Claims::for_user("01HOTHER", 3600);
            general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap())
        };

        let result = verify_token(&format!("{forged}.{signature}"), SECRET);
        assert!(matches!(result, Err(AppError::Unauthorized)));
        assert!(verify_token("garbage", SECRET).is_err());
    }
}
