use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::middleware::RateLimiter;

pub mod user;
pub mod house;
pub mod member;
pub mod meal;
pub mod deposit;
pub mod expense;
pub mod monthly_summary;

pub use user::*;
pub use house::*;
pub use member::*;
pub use meal::*;
pub use deposit::*;
pub use expense::*;
pub use monthly_summary::*;

/// Application state shared across all handlers
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub login_rate_limiter: Arc<RateLimiter>,
    pub reset_rate_limiter: Arc<RateLimiter>,
}

/// Decimal columns are stored as text; an unreadable value counts as zero
pub(crate) fn parse_decimal(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_else(|_| {
        log::warn!("Unreadable decimal value in database: {:?}", value);
        Decimal::ZERO
    })
}
