mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{AuthUser, auth_middleware, require_admin};
pub use error_handler::log_errors;
pub use rate_limit::{RateCategory, RateDecision, RateLimiter, api_rate_limit, client_ip};
