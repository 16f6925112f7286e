//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Users
// =============================================================================

/// A registered user
///
/// `password_hash` is absent for accounts created through Google sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub profile_picture: String,
    /// Google subject id (`sub` claim)
    pub google_id: Option<String>,
    /// "local" or "google"
    pub auth_provider: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

/// How a user signed up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProvider {
    Local,
    Google,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Google => "google",
        }
    }
}

/// Public profile fields embedded wherever a user is referenced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
}

// =============================================================================
// Posts, comments, replies
// =============================================================================

/// A feed post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    /// Stored path such as "/uploads/post-01H....png"
    pub image: Option<String>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A comment on a post
///
/// Content may be empty when an image is attached.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reply to a comment
///
/// Replies only carry legacy likes, never typed reactions.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reply {
    pub id: String,
    pub comment_id: String,
    pub author_id: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Reactions
// =============================================================================

/// The six reaction types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReactionType {
    Like,
    Love,
    Haha,
    Wow,
    Sad,
    Angry,
}

impl ReactionType {
    pub const ALL: [ReactionType; 6] = [
        Self::Like,
        Self::Love,
        Self::Haha,
        Self::Wow,
        Self::Sad,
        Self::Angry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Love => "love",
            Self::Haha => "haha",
            Self::Wow => "wow",
            Self::Sad => "sad",
            Self::Angry => "angry",
        }
    }
}

impl fmt::Display for ReactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown reaction name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid reaction type: {0}")]
pub struct UnknownReactionType(pub String);

impl FromStr for ReactionType {
    type Err = UnknownReactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownReactionType(s.to_string()))
    }
}

/// Kind of entity a reaction points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReactionTarget {
    Post,
    Comment,
}

impl ReactionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }

    /// Entity name used in "not found" errors
    pub fn label(&self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::Comment => "Comment",
        }
    }
}

/// One user's reaction to a post or comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction<U> {
    pub user: U,
    #[serde(rename = "type")]
    pub reaction_type: ReactionType,
}

/// Reaction row joined with its user's profile
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReactionRow {
    pub target_id: String,
    pub reaction_type: ReactionType,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
}

impl ReactionRow {
    pub fn into_reaction(self) -> (String, Reaction<UserSummary>) {
        (
            self.target_id,
            Reaction {
                user: UserSummary {
                    id: self.user_id,
                    first_name: self.first_name,
                    last_name: self.last_name,
                    profile_picture: self.profile_picture,
                },
                reaction_type: self.reaction_type,
            },
        )
    }
}

/// Reply like joined with the liking user's profile
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReplyLikeRow {
    pub reply_id: String,
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: String,
}

impl ReplyLikeRow {
    pub fn into_like(self) -> (String, UserSummary) {
        (
            self.reply_id,
            UserSummary {
                id: self.user_id,
                first_name: self.first_name,
                last_name: self.last_name,
                profile_picture: self.profile_picture,
            },
        )
    }
}

/// State of one user's reaction before and after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionUpdate {
    pub before: Option<ReactionType>,
    pub after: Option<ReactionType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_type_parses_canonical_names_only() {
        for kind in ReactionType::ALL {
            assert_eq!(kind.as_str().parse::<ReactionType>(), Ok(kind));
        }
        assert!("care".parse::<ReactionType>().is_err());
        assert!("Like".parse::<ReactionType>().is_err());
    }

    #[test]
    fn reaction_serializes_type_field() {
        let reaction = Reaction {
            user: "u1".to_string(),
            reaction_type: ReactionType::Wow,
        };
        let json = serde_json::to_value(&reaction).unwrap();
        assert_eq!(json, serde_json::json!({ "user": "u1", "type": "wow" }));
    }
}
