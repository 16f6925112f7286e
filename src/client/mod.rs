//! Client side of the API
//!
//! - `ApiClient`: typed reqwest client for the `/api` endpoints
//! - `ReactionController`: optimistic reaction state for one post or comment

mod controller;
mod error;
mod http;

pub use controller::{ReactionController, Resolution, SyncState};
pub use error::ClientError;
pub use http::{ApiClient, ImageFile, ReactionApi};

#[cfg(test)]
pub use http::MockReactionApi;
