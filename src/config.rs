// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Upper bound on exams fetched for listings and the landing page.
pub const EXAM_LIST_LIMIT: i64 = 999;

/// Default token lifetime: 7 days.
pub const DEFAULT_JWT_EXPIRATION: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    /// Seeds a teacher account at start-up when both are set.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok().filter(|v| !v.is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            admin_username,
            admin_password,
        }
    }
}
