//! Conversion functions from service views to API DTOs

use crate::api::dto::*;
use crate::data::User;
use crate::service::{
    CommentView, FeedPage, Pagination, PostView, ReactionChange, ReactionOutcome,
    ReplyLikeOutcome, ReplyView, reaction_counts,
};

/// Convert User to UserResponse
pub fn user_to_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        email: user.email.clone(),
        profile_picture: user.profile_picture.clone(),
    }
}

/// Convert PostView to PostResponse
pub fn post_to_response(view: PostView) -> PostResponse {
    let PostView {
        post,
        author,
        reactions,
        likes,
        reaction_counts,
        comment_count,
    } = view;

    PostResponse {
        id: post.id,
        author,
        content: post.content,
        image: post.image,
        is_private: post.is_private,
        likes,
        reactions,
        reaction_counts,
        comment_count,
        created_at: post.created_at,
        updated_at: post.updated_at,
    }
}

pub fn pagination_to_response(pagination: Pagination) -> PaginationResponse {
    PaginationResponse {
        current_page: pagination.current_page,
        total_pages: pagination.total_pages,
        total_posts: pagination.total_posts,
        has_more: pagination.has_more,
    }
}

/// Convert FeedPage to FeedResponse
pub fn feed_to_response(page: FeedPage) -> FeedResponse {
    FeedResponse {
        posts: page.posts.into_iter().map(post_to_response).collect(),
        pagination: pagination_to_response(page.pagination),
    }
}

/// Convert ReplyView to ReplyResponse
pub fn reply_to_response(view: ReplyView) -> ReplyResponse {
    let ReplyView {
        reply,
        author,
        likes,
    } = view;

    ReplyResponse {
        id: reply.id,
        comment_id: reply.comment_id,
        author,
        content: reply.content,
        image: reply.image,
        likes,
        created_at: reply.created_at,
        updated_at: reply.updated_at,
    }
}

/// Convert CommentView to CommentResponse
pub fn comment_to_response(view: CommentView) -> CommentResponse {
    let CommentView {
        comment,
        author,
        reactions,
        likes,
        reaction_counts,
        replies,
    } = view;

    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        author,
        content: comment.content,
        image: comment.image,
        likes,
        reactions,
        reaction_counts,
        replies: replies.into_iter().map(reply_to_response).collect(),
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

/// Convert ReactionOutcome to ReactionsResponse
pub fn reactions_to_response(outcome: ReactionOutcome) -> ReactionsResponse {
    let message = match outcome.change {
        Some(ReactionChange::Added) => "Reaction added",
        Some(ReactionChange::Changed { .. }) => "Reaction updated",
        Some(ReactionChange::Removed) => "Reaction removed",
        None => "Reaction unchanged",
    };

    ReactionsResponse {
        message: message.to_string(),
        reaction_counts: reaction_counts(&outcome.reactions),
        likes: outcome.likes,
        reactions: outcome.reactions,
    }
}

/// Convert ReplyLikeOutcome to LikesResponse
pub fn reply_likes_to_response(outcome: ReplyLikeOutcome) -> LikesResponse {
    let message = if outcome.liked {
        "Reply liked"
    } else {
        "Reply unliked"
    };

    LikesResponse {
        message: message.to_string(),
        likes: outcome.likes,
    }
}
