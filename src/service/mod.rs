//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database reads and transactional writes.

mod account;
mod comment;
mod feed;
mod post;
pub mod reaction;

pub use account::{AccountService, AuthSession, Registration, default_avatar};
pub use comment::{CommentService, CommentView, MAX_COMMENTS_PER_PAGE, ReplyView};
pub use feed::{FeedPage, FeedService, Pagination, resolve_paging};
pub use post::{PostService, PostView};
pub use reaction::{
    ReactionChange, ReactionOutcome, ReactionService, ReactorId, ReplyLikeOutcome, apply_reaction, liked_by,
    next_reaction, reaction_counts,
};
