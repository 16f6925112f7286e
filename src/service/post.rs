//! Post service
//!
//! Handles post operations: create, get, update content, delete,
//! and populating posts with authors, reactions and comment counts.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::data::{
    Database, EntityId, Post, Reaction, ReactionTarget, ReactionType, UserSummary,
};
use crate::error::AppError;
use crate::metrics::POSTS_TOTAL;

use super::reaction::{liked_by, reaction_counts, ReactionService};

/// Reject access to another user's private post
pub(crate) fn ensure_visible(post: &Post, viewer_id: &str) -> Result<(), AppError> {
    if post.is_private && post.author_id != viewer_id {
        return Err(AppError::Forbidden("This post is private"));
    }
    Ok(())
}

/// Post with everything a client renders alongside it
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: Post,
    pub author: UserSummary,
    pub reactions: Vec<Reaction<UserSummary>>,
    pub likes: Vec<UserSummary>,
    pub reaction_counts: BTreeMap<ReactionType, u32>,
    pub comment_count: i64,
}

/// Post service
pub struct PostService {
    db: Arc<Database>,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a new post
    ///
    /// # Arguments
    /// * `author_id` - Authenticated author
    /// * `content` - Post text (required)
    /// * `image` - Stored image path from `MediaStorage`
    /// * `is_private` - Visible to the author only
    pub async fn create(
        &self,
        author_id: &str,
        content: &str,
        image: Option<String>,
        is_private: bool,
    ) -> Result<PostView, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let now = Utc::now();
        let post = Post {
            id: EntityId::new().0,
            author_id: author_id.to_string(),
            content: content.to_string(),
            image,
            is_private,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_post(&post).await?;
        POSTS_TOTAL.inc();

        tracing::info!(post_id = %post.id, author_id, is_private, "Post created");

        self.view(post).await
    }

    /// Get a post visible to the viewer
    ///
    /// # Errors
    /// - `NotFound` if the post does not exist
    /// - `Forbidden` if it is another user's private post
    pub async fn get(&self, id: &str, viewer_id: &str) -> Result<PostView, AppError> {
        let post = self.find(id).await?;
        ensure_visible(&post, viewer_id)?;
        self.view(post).await
    }

    /// Replace the content of the caller's own post
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        content: &str,
    ) -> Result<PostView, AppError> {
        let mut post = self.find(id).await?;
        if post.author_id != user_id {
            return Err(AppError::Forbidden("Not authorized to update this post"));
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let now = Utc::now();
        if !self.db.update_post_content(id, content, now).await? {
            return Err(AppError::NotFound("Post"));
        }
        post.content = content.to_string();
        post.updated_at = now;

        self.view(post).await
    }

    /// Delete the caller's own post with its comments, replies and reactions
    ///
    /// # Returns
    /// The deleted post, so the caller can release its image
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<Post, AppError> {
        let post = self.find(id).await?;
        if post.author_id != user_id {
            return Err(AppError::Forbidden("Not authorized to delete this post"));
        }

        if !self.db.delete_post(id).await? {
            return Err(AppError::NotFound("Post"));
        }
        POSTS_TOTAL.dec();

        tracing::info!(post_id = id, "Post deleted");
        Ok(post)
    }

    /// Populate posts with authors, reactions, likes and comment counts
    ///
    /// Input order is preserved. Lookups are batched per kind.
    pub async fn populate(&self, posts: Vec<Post>) -> Result<Vec<PostView>, AppError> {
        if posts.is_empty() {
            return Ok(vec![]);
        }

        let post_ids: Vec<String> = posts.iter().map(|post| post.id.clone()).collect();
        let author_ids: Vec<String> = posts.iter().map(|post| post.author_id.clone()).collect();

        let authors = self.db.get_user_summaries(&author_ids).await?;
        let mut reactions = ReactionService::new(self.db.clone())
            .reactions_for(ReactionTarget::Post, &post_ids)
            .await?;
        let comment_counts = self.db.count_comments_for_posts(&post_ids).await?;

        posts
            .into_iter()
            .map(|post| {
                let author = authors
                    .get(&post.author_id)
                    .cloned()
                    .ok_or(AppError::NotFound("User"))?;
                let reactions = reactions.remove(&post.id).unwrap_or_default();
                let comment_count = comment_counts.get(&post.id).copied().unwrap_or(0);
                Ok(PostView {
                    likes: liked_by(&reactions),
                    reaction_counts: reaction_counts(&reactions),
                    reactions,
                    author,
                    comment_count,
                    post,
                })
            })
            .collect()
    }

    async fn view(&self, post: Post) -> Result<PostView, AppError> {
        self.populate(vec![post])
            .await?
            .pop()
            .ok_or(AppError::NotFound("Post"))
    }

    async fn find(&self, id: &str) -> Result<Post, AppError> {
        self.db.get_post(id).await?.ok_or(AppError::NotFound("Post"))
    }
}
