//! Upload storage module
//!
//! Handles:
//! - Image type validation
//! - Writing uploaded images to the uploads directory

mod media;

pub use media::{ImageKind, MediaStorage, UPLOADS_URL_PREFIX};
