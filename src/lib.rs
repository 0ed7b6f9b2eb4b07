use std::sync::Arc;

use config::Config;
use sqlx::PgPool;

use cache::store::CacheStore;
use middleware::RateLimiter;

pub mod api;
pub mod cache;
pub mod config;
pub mod middleware;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub cache: Arc<CacheStore>,
    pub limiter: Arc<RateLimiter>,
}
