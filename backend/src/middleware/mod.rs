pub mod auth;
pub mod rate_limit;

pub use auth::RequestContext;
pub use rate_limit::RateLimiter;
