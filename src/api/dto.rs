//! API request and response DTOs
//!
//! All JSON keys are camelCase.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Reaction, ReactionType, UnknownReactionType, UserSummary};
use crate::error::AppError;

// =============================================================================
// Requests
// =============================================================================

/// POST /api/auth/register
///
/// Fields are optional so a missing one is reported as a validation error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/google
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleLoginRequest {
    pub id_token: String,
}

/// PUT /api/posts/:id
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UpdatePostRequest {
    pub content: String,
}

/// POST /api/posts/:id/like and /api/comments/:id/like
///
/// An absent `reactionType` means a plain like.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactRequest {
    pub reaction_type: Option<String>,
}

impl ReactRequest {
    /// Requested reaction, validated against the six known types
    pub fn reaction_type(&self) -> Result<ReactionType, AppError> {
        match self.reaction_type.as_deref().map(str::trim) {
            None | Some("") => Ok(ReactionType::Like),
            Some(raw) => raw
                .parse()
                .map_err(|e: UnknownReactionType| AppError::Validation(e.to_string())),
        }
    }
}

/// Query string of GET /api/posts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Query string of GET /api/comments/post/:postId
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentsQuery {
    pub limit: Option<i64>,
}

// =============================================================================
// Responses
// =============================================================================

/// Authenticated user as returned by the auth endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub profile_picture: String,
}

/// Register/login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

/// GET /api/auth/me
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

/// Post with derived reaction data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub author: UserSummary,
    pub content: String,
    pub image: Option<String>,
    pub is_private: bool,
    pub likes: Vec<UserSummary>,
    pub reactions: Vec<Reaction<UserSummary>>,
    pub reaction_counts: BTreeMap<ReactionType, u32>,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single post response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEnvelope {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    pub post: PostResponse,
}

/// Feed pagination block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResponse {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_posts: i64,
    pub has_more: bool,
}

/// GET /api/posts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedResponse {
    pub posts: Vec<PostResponse>,
    pub pagination: PaginationResponse,
}

/// Reply with legacy likes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub id: String,
    pub comment_id: String,
    pub author: UserSummary,
    pub content: String,
    pub image: Option<String>,
    pub likes: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment with reactions and inlined replies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub author: UserSummary,
    pub content: String,
    pub image: Option<String>,
    pub likes: Vec<UserSummary>,
    pub reactions: Vec<Reaction<UserSummary>>,
    pub reaction_counts: BTreeMap<ReactionType, u32>,
    pub replies: Vec<ReplyResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// POST /api/comments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentEnvelope {
    pub comment: CommentResponse,
}

/// GET /api/comments/post/:postId
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentsEnvelope {
    pub comments: Vec<CommentResponse>,
}

/// POST /api/comments/:commentId/reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub reply: ReplyResponse,
}

/// Reaction endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsResponse {
    pub message: String,
    pub likes: Vec<UserSummary>,
    pub reactions: Vec<Reaction<UserSummary>>,
    pub reaction_counts: BTreeMap<ReactionType, u32>,
}

/// POST /api/comments/reply/:id/like
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikesResponse {
    pub message: String,
    pub likes: Vec<UserSummary>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /api/health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server started
    pub uptime: f64,
}
