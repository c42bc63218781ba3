//! Route Handlers

pub mod predictions;
pub mod stats;
pub mod wishes;
