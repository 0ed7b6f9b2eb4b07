use std::env;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    // 限流后端（可选，缺失时限流降级为放行）
    pub ratelimit_redis_url: Option<String>,
    pub ratelimit_redis_token: Option<String>,
    // 缓存后端（可选，缺失时缓存降级为直读数据库）
    pub cache_redis_url: Option<String>,
    pub cache_redis_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let jwt_expiration = env::var("JWT_EXPIRATION")?
            .trim_end_matches('h')
            .parse::<u64>()
            .unwrap_or(24);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_secs: jwt_expiration * 3600,
            server_host: env::var("SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")?.parse().unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".to_string()),
            ratelimit_redis_url: env::var("RATELIMIT_REDIS_URL").ok(),
            ratelimit_redis_token: env::var("RATELIMIT_REDIS_TOKEN").ok(),
            cache_redis_url: env::var("CACHE_REDIS_URL").ok(),
            cache_redis_token: env::var("CACHE_REDIS_TOKEN").ok(),
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            database_url: "postgres://localhost/bzion".into(),
            jwt_secret: "secret".into(),
            jwt_expiration_secs: 24 * 3600,
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            ratelimit_redis_url: None,
            ratelimit_redis_token: None,
            cache_redis_url: None,
            cache_redis_token: None,
        }
    }

    #[test]
    fn jwt_expiration_converts_to_duration() {
        let config = sample();
        assert_eq!(config.jwt_expiration(), Duration::from_secs(86400));
    }
}
