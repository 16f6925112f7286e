//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite database operations
//! - Entity models shared with the service and API layers

mod database;
mod models;

pub use database::Database;
pub use models::*;
