//! Storage Layer
//!
//! SQLite persistence for the seeded predictions and visitor wishes.

mod models;
mod random;
mod repository;
mod seed;

pub use models::{Color, Prediction, Wish};
pub use random::{RandomSource, ThreadRandom};
pub use repository::{Repository, DEFAULT_RECENT_LIMIT};
pub use seed::SEED_PREDICTIONS;

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
