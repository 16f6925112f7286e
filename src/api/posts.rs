//! Post endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use super::converters::{feed_to_response, post_to_response, reactions_to_response};
use super::dto::{
    FeedQuery, FeedResponse, MessageResponse, PostEnvelope, ReactRequest, ReactionsResponse,
    UpdatePostRequest,
};
use super::extract::{ApiJson, OptionalJson, UploadForm, discard_image};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::ReactionTarget;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL, observe_db_query};
use crate::service::{FeedService, PostService, ReactionService};

fn build_post_service(state: &AppState) -> PostService {
    PostService::new(state.db.clone())
}

/// GET /api/posts?page=&limit=
pub async fn list_posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/posts"])
        .start_timer();

    let started = std::time::Instant::now();
    let page = FeedService::new(state.db.clone(), state.config.feed.clone())
        .page(&user.id, query.page, query.limit)
        .await?;
    observe_db_query("SELECT", "posts", started.elapsed());

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/posts", "200"])
        .inc();

    Ok(Json(feed_to_response(page)))
}

/// POST /api/posts (multipart: content, isPrivate, image?)
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    form: UploadForm,
) -> Result<(StatusCode, Json<PostEnvelope>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/posts"])
        .start_timer();

    let content = form.text("content").unwrap_or_default();
    if content.trim().is_empty() {
        return Err(AppError::Validation("Content is required".to_string()));
    }
    let image = form.store_image(&state.storage, "post").await?;

    let started = std::time::Instant::now();
    let created = build_post_service(&state)
        .create(&user.id, content, image.clone(), form.flag("isPrivate"))
        .await;
    observe_db_query("INSERT", "posts", started.elapsed());
    let view = match created {
        Ok(view) => view,
        Err(error) => {
            discard_image(&state, image).await;
            return Err(error);
        }
    };

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/posts", "201"])
        .inc();

    Ok((
        StatusCode::CREATED,
        Json(PostEnvelope {
            message: Some("Post created successfully".to_string()),
            post: post_to_response(view),
        }),
    ))
}

/// GET /api/posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<PostEnvelope>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/posts/:id"])
        .start_timer();

    let view = build_post_service(&state).get(&id, &user.id).await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/posts/:id", "200"])
        .inc();

    Ok(Json(PostEnvelope {
        message: None,
        post: post_to_response(view),
    }))
}

/// PUT /api/posts/:id
pub async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdatePostRequest>,
) -> Result<Json<PostEnvelope>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["PUT", "/api/posts/:id"])
        .start_timer();

    let view = build_post_service(&state)
        .update(&id, &user.id, &req.content)
        .await?;

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["PUT", "/api/posts/:id", "200"])
        .inc();

    Ok(Json(PostEnvelope {
        message: Some("Post updated successfully".to_string()),
        post: post_to_response(view),
    }))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["DELETE", "/api/posts/:id"])
        .start_timer();

    let started = std::time::Instant::now();
    let post = build_post_service(&state).delete(&id, &user.id).await?;
    observe_db_query("DELETE", "posts", started.elapsed());

    if let Some(image) = post.image {
        if let Err(error) = state.storage.delete(&image).await {
            tracing::warn!(post_id = %id, %error, "Failed to remove post image");
        }
    }

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["DELETE", "/api/posts/:id", "200"])
        .inc();

    Ok(Json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}

/// POST /api/posts/:id/like {reactionType}
pub async fn react_to_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    OptionalJson(body): OptionalJson<ReactRequest>,
) -> Result<Json<ReactionsResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/posts/:id/like"])
        .start_timer();

    let requested = body.reaction_type()?;

    let started = std::time::Instant::now();
    let outcome = ReactionService::new(state.db.clone())
        .react(ReactionTarget::Post, &id, &user.id, requested)
        .await?;
    observe_db_query("UPSERT", "reactions", started.elapsed());

    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/api/posts/:id/like", "200"])
        .inc();

    Ok(Json(reactions_to_response(outcome)))
}
