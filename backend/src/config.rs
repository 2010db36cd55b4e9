use chrono_tz::Tz;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be a number")]
    InvalidNumber(&'static str),
    #[error("Unknown time zone: {0}")]
    InvalidTimezone(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub join_token_expiry_hours: i64,
    /// Decides which month is "current" when a request omits month/year
    pub timezone: Tz,
    pub cors_origins: Vec<String>,
    pub static_files_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", "8080")?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:mealbook.db?mode=rwc".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "development-secret-key-change-in-production".to_string()),
            jwt_expiration_hours: parse_var("JWT_EXPIRATION_HOURS", "24")?,
            join_token_expiry_hours: parse_var("JOIN_TOKEN_EXPIRY_HOURS", "72")?,
            timezone: {
                let name = env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
                name.parse::<Tz>()
                    .map_err(|_| ConfigError::InvalidTimezone(name))?
            },
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            static_files_path: env::var("STATIC_FILES_PATH").ok(),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidNumber(name))
}
