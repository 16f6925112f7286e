//! Comment service
//!
//! Creates comments and replies and assembles comment threads.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;

use crate::data::{
    Comment, Database, EntityId, Post, Reaction, ReactionTarget, ReactionType, Reply,
    UserSummary,
};
use crate::error::AppError;
use crate::metrics::COMMENTS_TOTAL;

use super::post::ensure_visible;
use super::reaction::{liked_by, reaction_counts, ReactionService};

/// Upper bound for the `limit` of a comment listing
pub const MAX_COMMENTS_PER_PAGE: i64 = 100;

/// Comment with author, reactions and inlined replies
#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author: UserSummary,
    pub reactions: Vec<Reaction<UserSummary>>,
    pub likes: Vec<UserSummary>,
    pub reaction_counts: BTreeMap<ReactionType, u32>,
    pub replies: Vec<ReplyView>,
}

/// Reply with author and legacy likes
#[derive(Debug, Clone)]
pub struct ReplyView {
    pub reply: Reply,
    pub author: UserSummary,
    pub likes: Vec<UserSummary>,
}

/// Trimmed content, or an error when neither text nor image is present
fn normalize_body(content: &str, image: &Option<String>) -> Result<String, AppError> {
    let content = content.trim();
    if content.is_empty() && image.is_none() {
        return Err(AppError::Validation(
            "Content or image is required".to_string(),
        ));
    }
    Ok(content.to_string())
}

/// Comment service
pub struct CommentService {
    db: Arc<Database>,
}

impl CommentService {
    /// Create new comment service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Comment on a post
    ///
    /// # Errors
    /// - `NotFound` if the post does not exist
    /// - `Forbidden` if the post is another user's private post
    /// - `Validation` if both content and image are missing
    pub async fn create_comment(
        &self,
        post_id: &str,
        author_id: &str,
        content: &str,
        image: Option<String>,
    ) -> Result<CommentView, AppError> {
        let post = self.visible_post(post_id, author_id).await?;
        let content = normalize_body(content, &image)?;

        let now = Utc::now();
        let comment = Comment {
            id: EntityId::new().0,
            post_id: post.id,
            author_id: author_id.to_string(),
            content,
            image,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_comment(&comment).await?;
        COMMENTS_TOTAL.with_label_values(&["comment"]).inc();

        tracing::info!(comment_id = %comment.id, post_id, author_id, "Comment created");

        let author = self.author(author_id).await?;
        Ok(CommentView {
            comment,
            author,
            reactions: Vec::new(),
            likes: Vec::new(),
            reaction_counts: BTreeMap::new(),
            replies: Vec::new(),
        })
    }

    /// Reply to a comment
    ///
    /// The reply is linked to its comment through `comment_id` alone, so a
    /// single insert creates and attaches it.
    pub async fn create_reply(
        &self,
        comment_id: &str,
        author_id: &str,
        content: &str,
        image: Option<String>,
    ) -> Result<ReplyView, AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or(AppError::NotFound("Comment"))?;
        self.visible_post(&comment.post_id, author_id).await?;
        let content = normalize_body(content, &image)?;

        let now = Utc::now();
        let reply = Reply {
            id: EntityId::new().0,
            comment_id: comment.id,
            author_id: author_id.to_string(),
            content,
            image,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_reply(&reply).await?;
        COMMENTS_TOTAL.with_label_values(&["reply"]).inc();

        tracing::info!(reply_id = %reply.id, comment_id, author_id, "Reply created");

        let author = self.author(author_id).await?;
        Ok(ReplyView {
            reply,
            author,
            likes: Vec::new(),
        })
    }

    /// List a post's comments oldest first with replies inlined
    ///
    /// # Arguments
    /// * `post_id` - Post whose comments to list
    /// * `viewer_id` - Authenticated user
    /// * `limit` - Optional cap on the number of comments (at most 100)
    pub async fn list_comments(
        &self,
        post_id: &str,
        viewer_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<CommentView>, AppError> {
        self.visible_post(post_id, viewer_id).await?;

        let limit = match limit {
            Some(limit) if limit < 1 => {
                return Err(AppError::Validation(
                    "limit must be greater than 0".to_string(),
                ))
            }
            Some(limit) => limit.min(MAX_COMMENTS_PER_PAGE),
            None => MAX_COMMENTS_PER_PAGE,
        };

        let comments = self.db.get_comments_for_post(post_id, limit).await?;
        if comments.is_empty() {
            return Ok(vec![]);
        }

        let comment_ids: Vec<String> = comments.iter().map(|c| c.id.clone()).collect();
        let replies = self.db.get_replies_for_comments(&comment_ids).await?;
        let reply_ids: Vec<String> = replies.iter().map(|r| r.id.clone()).collect();

        let mut user_ids: Vec<String> = comments
            .iter()
            .map(|c| c.author_id.clone())
            .chain(replies.iter().map(|r| r.author_id.clone()))
            .collect();
        user_ids.sort();
        user_ids.dedup();
        let authors = self.db.get_user_summaries(&user_ids).await?;

        let reaction_service = ReactionService::new(self.db.clone());
        let mut reactions = reaction_service
            .reactions_for(ReactionTarget::Comment, &comment_ids)
            .await?;
        let mut reply_likes = reaction_service.reply_likes_for(&reply_ids).await?;

        let mut replies_by_comment: HashMap<String, Vec<ReplyView>> = HashMap::new();
        for reply in replies {
            let author = lookup_author(&authors, &reply.author_id)?;
            let likes = reply_likes.remove(&reply.id).unwrap_or_default();
            replies_by_comment
                .entry(reply.comment_id.clone())
                .or_default()
                .push(ReplyView {
                    reply,
                    author,
                    likes,
                });
        }

        comments
            .into_iter()
            .map(|comment| {
                let author = lookup_author(&authors, &comment.author_id)?;
                let reactions = reactions.remove(&comment.id).unwrap_or_default();
                let replies = replies_by_comment.remove(&comment.id).unwrap_or_default();
                Ok(CommentView {
                    likes: liked_by(&reactions),
                    reaction_counts: reaction_counts(&reactions),
                    reactions,
                    author,
                    replies,
                    comment,
                })
            })
            .collect()
    }

    async fn visible_post(&self, post_id: &str, viewer_id: &str) -> Result<Post, AppError> {
        let post = self
            .db
            .get_post(post_id)
            .await?
            .ok_or(AppError::NotFound("Post"))?;
        ensure_visible(&post, viewer_id)?;
        Ok(post)
    }

    async fn author(&self, user_id: &str) -> Result<UserSummary, AppError> {
        self.db
            .get_user(user_id)
            .await?
            .map(|user| user.summary())
            .ok_or(AppError::NotFound("User"))
    }
}

fn lookup_author(
    authors: &HashMap<String, UserSummary>,
    user_id: &str,
) -> Result<UserSummary, AppError> {
    authors
        .get(user_id)
        .cloned()
        .ok_or(AppError::NotFound("User"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_without_image_is_rejected() {
        assert!(matches!(
            normalize_body("   ", &None),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn image_only_body_is_accepted() {
        let image = Some("/uploads/comment-1.png".to_string());
        assert_eq!(normalize_body("", &image).unwrap(), "");
    }

    #[test]
    fn body_is_trimmed() {
        assert_eq!(normalize_body("  hi  ", &None).unwrap(), "hi");
    }
}
