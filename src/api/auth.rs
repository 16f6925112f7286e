//! Authentication endpoints

use axum::{Json, extract::State, http::StatusCode};

use super::converters::user_to_response;
use super::dto::{AuthResponse, GoogleLoginRequest, LoginRequest, RegisterRequest, UserEnvelope};
use super::extract::ApiJson;
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};
use crate::service::{AccountService, AuthSession, Registration};

fn build_account_service(state: &AppState) -> AccountService {
    AccountService::new(state.db.clone(), state.config.auth.clone())
}

fn auth_response(message: &str, session: AuthSession) -> AuthResponse {
    AuthResponse {
        message: message.to_string(),
        user: user_to_response(&session.user),
        token: session.token,
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/auth/register"])
        .start_timer();

    let session = build_account_service(&state)
        .register(Registration {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password: req.password,
        })
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/auth/register", "201"])
        .inc();

    Ok((
        StatusCode::CREATED,
        Json(auth_response("User registered successfully", session)),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/auth/login"])
        .start_timer();

    let session = build_account_service(&state)
        .login(&req.email, &req.password)
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/auth/login", "200"])
        .inc();

    Ok(Json(auth_response("Login successful", session)))
}

/// POST /api/auth/google
pub async fn google_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/auth/google"])
        .start_timer();

    let session = build_account_service(&state)
        .google_login(state.google.as_ref(), &req.id_token)
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/auth/google", "200"])
        .inc();

    Ok(Json(auth_response("Google login successful", session)))
}

/// GET /api/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserEnvelope> {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/auth/me", "200"])
        .inc();

    Json(UserEnvelope {
        user: user_to_response(&user),
    })
}
