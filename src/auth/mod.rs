//! Authentication
//!
//! Handles:
//! - Signed bearer tokens
//! - Authentication middleware
//! - Google ID token verification

pub mod google;
mod middleware;
pub mod token;

pub use google::{GoogleIdentity, GoogleVerifier, IdTokenVerifier};
pub use middleware::{CurrentUser, TOKEN_COOKIE, require_auth};
pub use token::{Claims, create_token, verify_token};
