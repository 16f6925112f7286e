//! Account service
//!
//! Handles registration, password login and Google sign-in.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::auth::{Claims, GoogleIdentity, IdTokenVerifier, create_token};
use crate::config::AuthConfig;
use crate::data::{AuthProvider, Database, EntityId, User};
use crate::error::AppError;
use crate::metrics::USERS_TOTAL;

/// Number of bundled default avatars (`people1.png` ..)
const DEFAULT_AVATAR_COUNT: u32 = 3;

/// Pick one of the bundled default avatars
pub fn default_avatar() -> String {
    let index = rand::thread_rng().gen_range(1..=DEFAULT_AVATAR_COUNT);
    format!("/assets/images/people{}.png", index)
}

fn required(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// A signed-in user with a fresh bearer token
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    config: AuthConfig,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Register a local account
    ///
    /// # Errors
    /// - `Validation` if a field is missing or the email is taken
    pub async fn register(&self, registration: Registration) -> Result<AuthSession, AppError> {
        let (Some(first_name), Some(last_name), Some(email), Some(password)) = (
            required(&registration.first_name),
            required(&registration.last_name),
            required(&registration.email),
            required(&registration.password),
        ) else {
            return Err(AppError::Validation("All fields are required".to_string()));
        };
        let email = email.to_ascii_lowercase();

        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::Validation("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(password.to_string()).await?;
        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email,
            password_hash: Some(password_hash),
            profile_picture: default_avatar(),
            google_id: None,
            auth_provider: AuthProvider::Local.as_str().to_string(),
            email_verified: false,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_user(&user).await?;
        USERS_TOTAL.inc();

        tracing::info!(user_id = %user.id, "User registered");
        self.session(user)
    }

    /// Log in with email and password
    ///
    /// # Errors
    /// - `Validation` if a field is missing
    /// - `InvalidCredentials` for unknown email, wrong password or an
    ///   account without a password
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AppError> {
        let (Some(email), Some(password)) = (required(email), required(password)) else {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        };

        let user = self
            .db
            .get_user_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        let hash = user
            .password_hash
            .clone()
            .ok_or(AppError::InvalidCredentials)?;

        let password = password.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Encryption(e.to_string()))?;
        if !matches {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.session(user)
    }

    /// Sign in with a Google ID token
    ///
    /// Finds the account by Google id, then by email. An email account
    /// without a Google id gets it attached; otherwise a new account is
    /// created from the token's profile.
    ///
    /// # Errors
    /// `Unauthorized` if the email belongs to an account already linked to
    /// a different Google id
    pub async fn google_login(
        &self,
        verifier: &dyn IdTokenVerifier,
        id_token: &str,
    ) -> Result<AuthSession, AppError> {
        let id_token = required(id_token)
            .ok_or_else(|| AppError::Validation("idToken is required".to_string()))?;
        let identity = verifier.verify(id_token).await?;
        let subject = identity.subject.clone();

        let user = match self
            .db
            .find_user_for_google(&identity.subject, &identity.email)
            .await?
        {
            Some(user) if user.google_id.is_none() => {
                self.db
                    .link_google_account(&user.id, &identity.subject, Utc::now())
                    .await?;
                tracing::info!(user_id = %user.id, "Linked Google account");
                self.db
                    .get_user(&user.id)
                    .await?
                    .ok_or(AppError::NotFound("User"))?
            }
            Some(user) => user,
            None => self.create_google_user(identity).await?,
        };

        if user.google_id.as_deref() != Some(subject.as_str()) {
            tracing::warn!(user_id = %user.id, "Google sign-in for an account linked to another Google id");
            return Err(AppError::Unauthorized);
        }

        self.session(user)
    }

    async fn create_google_user(&self, identity: GoogleIdentity) -> Result<User, AppError> {
        let now = Utc::now();
        let user = User {
            id: EntityId::new().0,
            first_name: identity
                .given_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "User".to_string()),
            last_name: identity.family_name.unwrap_or_default(),
            email: identity.email.to_ascii_lowercase(),
            password_hash: None,
            profile_picture: identity
                .picture
                .filter(|picture| !picture.trim().is_empty())
                .unwrap_or_else(default_avatar),
            google_id: Some(identity.subject),
            auth_provider: AuthProvider::Google.as_str().to_string(),
            email_verified: identity.email_verified,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_user(&user).await?;
        USERS_TOTAL.inc();

        tracing::info!(user_id = %user.id, "User created from Google sign-in");
        Ok(user)
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let cost = self.config.password_hash_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .map_err(|e| AppError::Encryption(e.to_string()))
    }

    fn session(&self, user: User) -> Result<AuthSession, AppError> {
        let claims = Claims::for_user(&user.id, self.config.token_max_age);
        let token = create_token(&claims, &self.config.token_secret)?;
        Ok(AuthSession { token, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::google::MockIdTokenVerifier;
    use crate::auth::verify_token;
    use tempfile::TempDir;

    async fn create_service() -> (AccountService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(Database::connect(&temp_dir.path().join("test.db")).await.unwrap());
        let config = crate::config::tests::valid_config().auth;
        (AccountService::new(db.clone(), config), db, temp_dir)
    }

    fn registration(email: &str) -> Registration {
        Registration {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
        }
    }

    fn identity(subject: &str, email: &str) -> GoogleIdentity {
        GoogleIdentity {
            subject: subject.to_string(),
            email: email.to_string(),
            email_verified: true,
            given_name: Some("Gina".to_string()),
            family_name: Some("Goo".to_string()),
            picture: Some("https://lh3.googleusercontent.com/a/gina".to_string()),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (service, _db, _temp_dir) = create_service().await;

        let registered = service.register(registration("Jane@Example.com")).await.unwrap();
        assert_eq!(registered.user.email, "jane@example.com");
        assert!(registered.user.profile_picture.starts_with("/assets/images/people"));
        let claims = verify_token(&registered.token, &"x".repeat(32)).unwrap();
        assert_eq!(claims.user_id, registered.user.id);

        let session = service.login("jane@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn register_rejects_missing_fields_and_duplicates() {
        let (service, _db, _temp_dir) = create_service().await;

        let mut missing = registration("a@example.com");
        missing.last_name = "  ".to_string();
        assert!(matches!(
            service.register(missing).await,
            Err(AppError::Validation(_))
        ));

        service.register(registration("a@example.com")).await.unwrap();
        let duplicate = service.register(registration("a@example.com")).await;
        assert!(matches!(
            duplicate,
            Err(AppError::Validation(message)) if message == "Email already registered"
        ));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let (service, _db, _temp_dir) = create_service().await;
        service.register(registration("b@example.com")).await.unwrap();

        assert!(matches!(
            service.login("b@example.com", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody@example.com", "hunter22").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("", "hunter22").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn google_login_creates_then_reuses_account() {
        let (service, db, _temp_dir) = create_service().await;

        let mut verifier = MockIdTokenVerifier::new();
        verifier
            .expect_verify()
            .times(2)
            .returning(|_| Ok(identity("g-1", "gina@example.com")));

        let first = service.google_login(&verifier, "token").await.unwrap();
        assert_eq!(first.user.google_id.as_deref(), Some("g-1"));
        assert_eq!(first.user.first_name, "Gina");
        assert!(first.user.password_hash.is_none());

        let second = service.google_login(&verifier, "token").await.unwrap();
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn google_login_links_existing_email_account() {
        let (service, _db, _temp_dir) = create_service().await;
        let local = service.register(registration("gina@example.com")).await.unwrap();

        let mut verifier = MockIdTokenVerifier::new();
        verifier
            .expect_verify()
            .returning(|_| Ok(identity("g-2", "gina@example.com")));

        let session = service.google_login(&verifier, "token").await.unwrap();
        assert_eq!(session.user.id, local.user.id);
        assert_eq!(session.user.google_id.as_deref(), Some("g-2"));
        assert_eq!(session.user.auth_provider, "google");
        // Password login keeps working after linking
        assert!(service.login("gina@example.com", "hunter22").await.is_ok());
    }

    #[tokio::test]
    async fn google_login_rejects_email_linked_to_other_google_id() {
        let (service, db, _temp_dir) = create_service().await;

        let mut verifier = MockIdTokenVerifier::new();
        verifier
            .expect_verify()
            .times(1)
            .returning(|_| Ok(identity("g-3", "gina@example.com")));
        let owner = service.google_login(&verifier, "token").await.unwrap();

        let mut other = MockIdTokenVerifier::new();
        other
            .expect_verify()
            .returning(|_| Ok(identity("g-4", "GINA@example.com")));
        assert!(matches!(
            service.google_login(&other, "token").await,
            Err(AppError::Unauthorized)
        ));

        let stored = db.get_user(&owner.user.id).await.unwrap().unwrap();
        assert_eq!(stored.google_id.as_deref(), Some("g-3"));
        assert_eq!(db.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn google_login_propagates_verifier_rejection() {
        let (service, _db, _temp_dir) = create_service().await;

        let mut verifier = MockIdTokenVerifier::new();
        verifier
            .expect_verify()
            .returning(|_| Err(AppError::Unauthorized));

        assert!(matches!(
            service.google_login(&verifier, "bad").await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            service.google_login(&verifier, " ").await,
            Err(AppError::Validation(_))
        ));
    }
}
