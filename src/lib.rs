// src/lib.rs

pub mod config;
pub mod engines;
pub mod error;
pub mod models;
pub mod store;

// Re-export specific items for convenience if needed
pub use error::CoreError;
