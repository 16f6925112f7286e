//! Optimistic reaction state for one post or comment
//!
//! A user action is applied locally right away with the same rule the
//! server uses. Each action gets a sequence number; only the response to
//! the newest action may settle the state, so a slow response to an older
//! toggle can no longer overwrite a newer one.

use std::collections::BTreeMap;

use super::error::ClientError;
use super::http::ReactionApi;
use crate::api::dto::{CommentResponse, PostResponse, ReactionsResponse};
use crate::data::{Reaction, ReactionTarget, ReactionType, UserSummary};
use crate::service::{ReactionChange, apply_reaction, liked_by, reaction_counts};

/// Whether local state is confirmed by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// Local state matches the last server response
    Settled,
    /// An optimistic change is waiting for request `seq`
    Pending {
        seq: u64,
        snapshot: Vec<Reaction<UserSummary>>,
    },
}

/// What `resolve` did with a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Server state replaced the optimistic state
    Applied,
    /// The response belonged to an older action and was dropped
    Stale,
}

/// Reaction state of one post or comment as displayed to its viewer
#[derive(Debug, Clone)]
pub struct ReactionController {
    target: ReactionTarget,
    target_id: String,
    reactions: Vec<Reaction<UserSummary>>,
    likes: Vec<UserSummary>,
    state: SyncState,
    last_seq: u64,
}

impl ReactionController {
    pub fn new(
        target: ReactionTarget,
        target_id: impl Into<String>,
        reactions: Vec<Reaction<UserSummary>>,
    ) -> Self {
        let likes = liked_by(&reactions);
        Self {
            target,
            target_id: target_id.into(),
            reactions,
            likes,
            state: SyncState::Settled,
            last_seq: 0,
        }
    }

    pub fn for_post(post: &PostResponse) -> Self {
        Self::new(ReactionTarget::Post, post.id.clone(), post.reactions.clone())
    }

    pub fn for_comment(comment: &CommentResponse) -> Self {
        Self::new(
            ReactionTarget::Comment,
            comment.id.clone(),
            comment.reactions.clone(),
        )
    }

    pub fn target(&self) -> ReactionTarget {
        self.target
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn reactions(&self) -> &[Reaction<UserSummary>] {
        &self.reactions
    }

    pub fn likes(&self) -> &[UserSummary] {
        &self.likes
    }

    pub fn reaction_counts(&self) -> BTreeMap<ReactionType, u32> {
        reaction_counts(&self.reactions)
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SyncState::Pending { .. })
    }

    /// Reaction the given user currently shows
    pub fn reaction_of(&self, user_id: &str) -> Option<ReactionType> {
        self.reactions
            .iter()
            .find(|entry| entry.user.id == user_id)
            .map(|entry| entry.reaction_type)
    }

    /// Apply a user action optimistically
    ///
    /// # Returns
    /// The sequence number to pass to `resolve` with the server's answer
    pub fn begin(&mut self, user: UserSummary, requested: ReactionType) -> (u64, ReactionChange) {
        let snapshot = self.reactions.clone();
        let change = apply_reaction(&mut self.reactions, user, requested);
        self.likes = liked_by(&self.reactions);

        self.last_seq += 1;
        self.state = SyncState::Pending {
            seq: self.last_seq,
            snapshot,
        };
        (self.last_seq, change)
    }

    /// Settle the state with the server's answer to request `seq`
    ///
    /// On success the server's reactions and likes replace the local ones.
    /// On failure the state before that action is restored and the error is
    /// returned. Answers to anything but the newest request are ignored.
    pub fn resolve<E>(
        &mut self,
        seq: u64,
        result: Result<ReactionsResponse, E>,
    ) -> Result<Resolution, E> {
        let snapshot = match &mut self.state {
            SyncState::Pending {
                seq: pending,
                snapshot,
            } if *pending == seq => std::mem::take(snapshot),
            _ => return Ok(Resolution::Stale),
        };

        match result {
            Ok(server) => {
                self.reactions = server.reactions;
                self.likes = server.likes;
                self.state = SyncState::Settled;
                Ok(Resolution::Applied)
            }
            Err(error) => {
                self.likes = liked_by(&snapshot);
                self.reactions = snapshot;
                self.state = SyncState::Settled;
                Err(error)
            }
        }
    }

    /// Apply locally, send the request and settle with its answer
    pub async fn react(
        &mut self,
        api: &dyn ReactionApi,
        user: UserSummary,
        requested: ReactionType,
    ) -> Result<Resolution, ClientError> {
        let (seq, change) = self.begin(user, requested);
        tracing::debug!(
            target_kind = self.target.as_str(),
            target_id = %self.target_id,
            seq,
            optimistic = change.as_str(),
            "Reaction sent"
        );

        let result = api.react(self.target, &self.target_id, requested).await;
        let resolution = self.resolve(seq, result);
        if let Err(error) = &resolution {
            tracing::warn!(target_id = %self.target_id, %error, "Reaction failed; reverted");
        }
        resolution
    }
}
