// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Default time limit for a round: 20 minutes.
pub const DEFAULT_TIME_LIMIT_MS: i64 = 1_200_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub default_time_limit_ms: i64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let default_time_limit_ms = env::var("DEFAULT_TIME_LIMIT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIME_LIMIT_MS);

        Self {
            database_url,
            rust_log,
            default_time_limit_ms,
        }
    }
}
