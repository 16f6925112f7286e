//! Comment and reply endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::converters::{
    comment_to_response, reactions_to_response, reply_likes_to_response, reply_to_response,
};
use super::dto::{
    CommentEnvelope, CommentsEnvelope, CommentsQuery, LikesResponse, ReactRequest,
    ReactionsResponse, ReplyEnvelope,
};
use super::extract::{OptionalJson, UploadForm, discard_image};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::ReactionTarget;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL, observe_db_query};
use crate::service::{CommentService, ReactionService};

fn build_comment_service(state: &AppState) -> CommentService {
    CommentService::new(state.db.clone())
}

/// POST /api/comments (multipart: postId, content, image?)
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    form: UploadForm,
) -> Result<(StatusCode, Json<CommentEnvelope>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/comments"])
        .start_timer();

    let post_id = form
        .text("postId")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("postId is required".to_string()))?;
    let image = form.store_image(&state.storage, "comment").await?;
    let content = form.text("content").unwrap_or_default();

    let started = std::time::Instant::now();
    let view = match build_comment_service(&state)
        .create_comment(post_id, &user.id, content, image.clone())
        .await
    {
        Ok(view) => view,
        Err(error) => {
            discard_image(&state, image).await;
            return Err(error);
        }
    };
    observe_db_query("INSERT", "comments", started.elapsed());

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/comments", "201"])
        .inc();

    Ok((
        StatusCode::CREATED,
        Json(CommentEnvelope {
            comment: comment_to_response(view),
        }),
    ))
}

/// GET /api/comments/post/:postId?limit=
pub async fn list_comments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<CommentsEnvelope>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/comments/post/:postId"])
        .start_timer();

    let started = std::time::Instant::now();
    let comments = build_comment_service(&state)
        .list_comments(&post_id, &user.id, query.limit)
        .await?;
    observe_db_query("SELECT", "comments", started.elapsed());

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/comments/post/:postId", "200"])
        .inc();

    Ok(Json(CommentsEnvelope {
        comments: comments.into_iter().map(comment_to_response).collect(),
    }))
}

/// POST /api/comments/:id/like {reactionType}
pub async fn react_to_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    OptionalJson(body): OptionalJson<ReactRequest>,
) -> Result<Json<ReactionsResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/comments/:id/like"])
        .start_timer();

    let requested = body.reaction_type()?;

    let started = std::time::Instant::now();
    let outcome = ReactionService::new(state.db.clone())
        .react(ReactionTarget::Comment, &id, &user.id, requested)
        .await?;
    observe_db_query("UPSERT", "reactions", started.elapsed());

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/comments/:id/like", "200"])
        .inc();

    Ok(Json(reactions_to_response(outcome)))
}

/// POST /api/comments/:commentId/reply (multipart: content, image?)
pub async fn create_reply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
    form: UploadForm,
) -> Result<(StatusCode, Json<ReplyEnvelope>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/comments/:commentId/reply"])
        .start_timer();

    let image = form.store_image(&state.storage, "reply").await?;
    let content = form.text("content").unwrap_or_default();

    let started = std::time::Instant::now();
    let view = match build_comment_service(&state)
        .create_reply(&comment_id, &user.id, content, image.clone())
        .await
    {
        Ok(view) => view,
        Err(error) => {
            discard_image(&state, image).await;
            return Err(error);
        }
    };
    observe_db_query("INSERT", "replies", started.elapsed());

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/comments/:commentId/reply", "201"])
        .inc();

    Ok((
        StatusCode::CREATED,
        Json(ReplyEnvelope {
            reply: reply_to_response(view),
        }),
    ))
}

/// POST /api/comments/reply/:id/like
pub async fn like_reply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LikesResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/comments/reply/:id/like"])
        .start_timer();

    let outcome = ReactionService::new(state.db.clone())
        .toggle_reply_like(&id, &user.id)
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/comments/reply/:id/like", "200"])
        .inc();

    Ok(Json(reply_likes_to_response(outcome)))
}
