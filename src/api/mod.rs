//! API layer
//!
//! JSON handlers under `/api`:
//! - `auth`: register, login, Google sign-in, current user
//! - `posts`: feed, post CRUD, post reactions
//! - `comments`: comments, replies, comment reactions, reply likes
//! - `health`: liveness
//!
//! Everything except register/login/google/health sits behind `require_auth`.

mod auth;
mod comments;
pub mod converters;
pub mod dto;
mod extract;
mod health;
pub mod metrics;
mod posts;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::AppState;
use crate::auth::require_auth;

pub use extract::{ApiJson, ImageUpload, OptionalJson, UploadForm};
pub use metrics::metrics_router;

/// Routes nested under `/api`
pub fn api_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/google", post(auth::google_login))
        .route("/health", get(health::health));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/:id/like", post(posts::react_to_post))
        .route("/comments", post(comments::create_comment))
        .route("/comments/post/:post_id", get(comments::list_comments))
        .route("/comments/:id/like", post(comments::react_to_comment))
        .route("/comments/:id/reply", post(comments::create_reply))
        .route("/comments/reply/:id/like", post(comments::like_reply))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}
