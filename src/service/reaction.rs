//! Reaction service
//!
//! Holds the reaction rule shared by the server and the client controller,
//! and the transactional reaction/like writes built on top of it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::data::{
    Database, Reaction, ReactionTarget, ReactionType, ReactionUpdate, UserSummary,
};
use crate::error::AppError;
use crate::metrics::REACTIONS_TOTAL;

/// Anything that identifies the user behind a reaction entry
pub trait ReactorId {
    fn reactor_id(&self) -> &str;
}

impl ReactorId for String {
    fn reactor_id(&self) -> &str {
        self
    }
}

impl ReactorId for UserSummary {
    fn reactor_id(&self) -> &str {
        &self.id
    }
}

/// What a reaction request did to the user's entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Changed { from: ReactionType },
    Removed,
}

impl ReactionChange {
    /// Classify a before/after pair; `None` when nothing changed
    pub fn from_update(update: ReactionUpdate) -> Option<Self> {
        match (update.before, update.after) {
            (None, Some(_)) => Some(Self::Added),
            (Some(from), Some(to)) if from != to => Some(Self::Changed { from }),
            (Some(_), None) => Some(Self::Removed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Changed { .. } => "changed",
            Self::Removed => "removed",
        }
    }
}

/// Desired state of one user's reaction after requesting `requested`
///
/// Requesting the current type toggles it off.
pub fn next_reaction(
    current: Option<ReactionType>,
    requested: ReactionType,
) -> Option<ReactionType> {
    match current {
        Some(current) if current == requested => None,
        _ => Some(requested),
    }
}

/// Apply a reaction request to an ordered reaction list in place
///
/// Keeps at most one entry per user. A type change overwrites the existing
/// entry so it keeps its position; a new entry is appended.
pub fn apply_reaction<U: ReactorId>(
    reactions: &mut Vec<Reaction<U>>,
    user: U,
    requested: ReactionType,
) -> ReactionChange {
    let position = reactions
        .iter()
        .position(|entry| entry.user.reactor_id() == user.reactor_id());

    match position {
        Some(index) => {
            let current = reactions[index].reaction_type;
            match next_reaction(Some(current), requested) {
                Some(kind) => {
                    reactions[index].reaction_type = kind;
                    ReactionChange::Changed { from: current }
                }
                None => {
                    reactions.remove(index);
                    ReactionChange::Removed
                }
            }
        }
        None => {
            reactions.push(Reaction {
                user,
                reaction_type: requested,
            });
            ReactionChange::Added
        }
    }
}

/// Users whose current reaction is `like`
pub fn liked_by<U: Clone>(reactions: &[Reaction<U>]) -> Vec<U> {
    reactions
        .iter()
        .filter(|entry| entry.reaction_type == ReactionType::Like)
        .map(|entry| entry.user.clone())
        .collect()
}

/// Number of reactions per type
pub fn reaction_counts<U>(reactions: &[Reaction<U>]) -> BTreeMap<ReactionType, u32> {
    let mut counts = BTreeMap::new();
    for entry in reactions {
        *counts.entry(entry.reaction_type).or_insert(0) += 1;
    }
    counts
}

/// Result of a reaction write
#[derive(Debug, Clone)]
pub struct ReactionOutcome {
    /// Every reaction on the target after the write, oldest first
    pub reactions: Vec<Reaction<UserSummary>>,
    /// Derived from `reactions`
    pub likes: Vec<UserSummary>,
    pub change: Option<ReactionChange>,
}

/// Result of a reply like toggle
#[derive(Debug, Clone)]
pub struct ReplyLikeOutcome {
    /// Whether the user likes the reply after the toggle
    pub liked: bool,
    pub likes: Vec<UserSummary>,
}

/// Reaction service
pub struct ReactionService {
    db: Arc<Database>,
}

impl ReactionService {
    /// Create new reaction service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// React to a post or comment
    ///
    /// # Arguments
    /// * `target` - Post or comment
    /// * `target_id` - ID of the post or comment
    /// * `user_id` - Reacting user
    /// * `requested` - Requested reaction type
    ///
    /// # Errors
    /// - `NotFound` if the target does not exist
    /// - `Forbidden` if the target belongs to another user's private post
    pub async fn react(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
        requested: ReactionType,
    ) -> Result<ReactionOutcome, AppError> {
        self.ensure_target_visible(target, target_id, user_id)
            .await?;

        let update = self
            .db
            .update_reaction(target, target_id, user_id, move |current| {
                next_reaction(current, requested)
            })
            .await?;

        let change = ReactionChange::from_update(update);
        if let Some(change) = change {
            REACTIONS_TOTAL
                .with_label_values(&[target.as_str(), change.as_str()])
                .inc();
        }
        tracing::debug!(
            target_kind = target.as_str(),
            target_id,
            user_id,
            requested = %requested,
            outcome = change.map(|c| c.as_str()).unwrap_or("unchanged"),
            "Reaction applied"
        );

        let reactions = self
            .reactions_for(target, &[target_id.to_string()])
            .await?
            .remove(target_id)
            .unwrap_or_default();
        let likes = liked_by(&reactions);

        Ok(ReactionOutcome {
            reactions,
            likes,
            change,
        })
    }

    /// Toggle the current user's like on a reply
    ///
    /// # Errors
    /// - `NotFound` if the reply does not exist
    /// - `Forbidden` if the reply sits under another user's private post
    pub async fn toggle_reply_like(
        &self,
        reply_id: &str,
        user_id: &str,
    ) -> Result<ReplyLikeOutcome, AppError> {
        let reply = self
            .db
            .get_reply(reply_id)
            .await?
            .ok_or(AppError::NotFound("Reply"))?;
        self.ensure_target_visible(ReactionTarget::Comment, &reply.comment_id, user_id)
            .await?;

        let liked = self.db.toggle_reply_like(reply_id, user_id).await?;
        let outcome = if liked { "added" } else { "removed" };
        REACTIONS_TOTAL.with_label_values(&["reply", outcome]).inc();
        tracing::debug!(reply_id, user_id, outcome, "Reply like toggled");

        let likes = self
            .reply_likes_for(&[reply_id.to_string()])
            .await?
            .remove(reply_id)
            .unwrap_or_default();

        Ok(ReplyLikeOutcome { liked, likes })
    }

    /// Load populated reactions for several targets, keyed by target ID
    pub async fn reactions_for(
        &self,
        target: ReactionTarget,
        target_ids: &[String],
    ) -> Result<HashMap<String, Vec<Reaction<UserSummary>>>, AppError> {
        let rows = self.db.get_reactions(target, target_ids).await?;

        let mut grouped: HashMap<String, Vec<Reaction<UserSummary>>> = HashMap::new();
        for row in rows {
            let (target_id, reaction) = row.into_reaction();
            grouped.entry(target_id).or_default().push(reaction);
        }
        Ok(grouped)
    }

    /// Load populated likes for several replies, keyed by reply ID
    pub async fn reply_likes_for(
        &self,
        reply_ids: &[String],
    ) -> Result<HashMap<String, Vec<UserSummary>>, AppError> {
        let rows = self.db.get_reply_likes(reply_ids).await?;

        let mut grouped: HashMap<String, Vec<UserSummary>> = HashMap::new();
        for row in rows {
            let (reply_id, user) = row.into_like();
            grouped.entry(reply_id).or_default().push(user);
        }
        Ok(grouped)
    }

    async fn ensure_target_visible(
        &self,
        target: ReactionTarget,
        target_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let post_id = match target {
            ReactionTarget::Post => target_id.to_string(),
            ReactionTarget::Comment => {
                self.db
                    .get_comment(target_id)
                    .await?
                    .ok_or(AppError::NotFound("Comment"))?
                    .post_id
            }
        };

        let post = self
            .db
            .get_post(&post_id)
            .await?
            .ok_or(AppError::NotFound("Post"))?;
        super::post::ensure_visible(&post, user_id)
    }
}
