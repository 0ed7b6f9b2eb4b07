use std::net::IpAddr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode, header::HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::net::SocketAddr;

use crate::{
    AppState,
    cache::{
        client::RedisBackend, keys::rate_limit_window_key, models::rate_limit::WindowSnapshot,
        operations::rate_limit::RateLimitCacheOperations,
    },
    config::Config,
    utils::{error_codes, error_to_api_response},
};

/// 限流类别，每类一套固定配额
///
/// 认证和报价提交的配额远紧于普通读接口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateCategory {
    Api,
    Auth,
    Rfq,
    Newsletter,
}

impl RateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateCategory::Api => "api",
            RateCategory::Auth => "auth",
            RateCategory::Rfq => "rfq",
            RateCategory::Newsletter => "newsletter",
        }
    }

    /// 窗口内允许的请求数
    pub fn limit(&self) -> u32 {
        match self {
            RateCategory::Api => 10,
            RateCategory::Auth => 5,
            RateCategory::Rfq => 3,
            RateCategory::Newsletter => 5,
        }
    }

    /// 滑动窗口时长
    pub fn window(&self) -> Duration {
        match self {
            RateCategory::Api => Duration::from_secs(10),
            RateCategory::Auth => Duration::from_secs(15 * 60),
            RateCategory::Rfq => Duration::from_secs(60 * 60),
            RateCategory::Newsletter => Duration::from_secs(60 * 60),
        }
    }
}

/// 单次准入判定结果，随用随弃
///
/// 无论放行与否，调用方都应把三个字段写进响应头，
/// 拒绝时返回 429
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    /// 窗口重置的秒级时间戳
    pub reset_at: i64,
}

impl RateDecision {
    /// 后端不可用时的降级判定：放行，计数字段全零
    pub fn fail_open() -> Self {
        Self {
            admitted: true,
            limit: 0,
            remaining: 0,
            reset_at: 0,
        }
    }

    pub fn from_window(category: RateCategory, snapshot: WindowSnapshot, now_ms: i64) -> Self {
        let limit = category.limit();
        let remaining = (limit as i64 - snapshot.count).max(0) as u32;
        let window_secs = category.window().as_secs() as i64;
        let oldest_ms = snapshot.oldest_ms.unwrap_or(now_ms);
        Self {
            admitted: snapshot.count <= limit as i64,
            limit,
            remaining,
            reset_at: oldest_ms / 1000 + window_secs,
        }
    }

    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("x-ratelimit-limit", self.limit.to_string()),
            ("x-ratelimit-remaining", self.remaining.to_string()),
            ("x-ratelimit-reset", self.reset_at.to_string()),
        ]
    }

    /// 把限流头写进已有响应
    pub fn apply(&self, response: &mut Response) {
        for (name, value) in self.headers() {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                response.headers_mut().insert(name, value);
            }
        }
    }
}

/// 速率准入闸
///
/// 自身无状态，窗口计数全部委托给外部 Redis 后端；
/// 后端未配置或出错时放行
pub struct RateLimiter {
    backend: RedisBackend,
}

impl RateLimiter {
    pub fn new(config: &Config) -> Self {
        Self {
            backend: RedisBackend::new(
                "ratelimit",
                config.ratelimit_redis_url.clone(),
                config.ratelimit_redis_token.clone(),
            ),
        }
    }

    pub fn with_client(client: redis::Client) -> Self {
        Self {
            backend: RedisBackend::with_client("ratelimit", client),
        }
    }

    pub async fn check_rate_limit(&self, identifier: &str, category: RateCategory) -> RateDecision {
        let Some(mut conn) = self.backend.connection().await else {
            return RateDecision::fail_open();
        };

        let key = rate_limit_window_key(category.as_str(), identifier);
        let now_ms = Utc::now().timestamp_millis();
        match RateLimitCacheOperations::record_hit(
            &mut conn,
            &key,
            category.window().as_secs(),
            now_ms,
        )
        .await
        {
            Ok(snapshot) => RateDecision::from_window(category, snapshot, now_ms),
            Err(e) => {
                tracing::warn!(
                    "rate limit check failed for {} ({}): {}",
                    identifier,
                    category.as_str(),
                    e
                );
                RateDecision::fail_open()
            }
        }
    }
}

/// 提取调用方标识
///
/// 依次取 x-real-ip、x-forwarded-for 首个非空项、连接对端地址，
/// 全部缺失时退化为 "anonymous"
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .map(|s| s.trim().to_string())
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// 管理接口统一走 api 类别的限流层
pub async fn api_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    // 从连接信息获取原始IP，请求头缺失时兜底
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let ip = client_ip(req.headers(), peer);
    let decision = state
        .limiter
        .check_rate_limit(&ip, RateCategory::Api)
        .await;

    if !decision.admitted {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            error_to_api_response::<()>(error_codes::RATE_LIMIT, "请求过于频繁，请稍后重试".to_string()),
        )
            .into_response();
        decision.apply(&mut response);
        return response;
    }

    let mut response = next.run(req).await;
    decision.apply(&mut response);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unconfigured_limiter() -> RateLimiter {
        let config = Config {
            database_url: "postgres://localhost/bzion".into(),
            jwt_secret: "secret".into(),
            jwt_expiration_secs: 3600,
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            ratelimit_redis_url: None,
            ratelimit_redis_token: None,
            cache_redis_url: None,
            cache_redis_token: None,
        };
        RateLimiter::new(&config)
    }

    #[test]
    fn category_profiles_are_fixed() {
        assert_eq!(RateCategory::Api.limit(), 10);
        assert_eq!(RateCategory::Api.window(), Duration::from_secs(10));
        assert_eq!(RateCategory::Auth.limit(), 5);
        assert_eq!(RateCategory::Auth.window(), Duration::from_secs(900));
        assert_eq!(RateCategory::Rfq.limit(), 3);
        assert_eq!(RateCategory::Rfq.window(), Duration::from_secs(3600));
        assert_eq!(RateCategory::Newsletter.limit(), 5);
        assert_eq!(RateCategory::Newsletter.window(), Duration::from_secs(3600));
    }

    #[test]
    fn window_at_limit_is_still_admitted() {
        let snapshot = WindowSnapshot {
            count: 5,
            oldest_ms: Some(1_000_000),
        };
        let decision = RateDecision::from_window(RateCategory::Auth, snapshot, 1_200_000);
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn window_over_limit_is_denied_with_zero_remaining() {
        let snapshot = WindowSnapshot {
            count: 6,
            oldest_ms: Some(1_000_000),
        };
        let decision = RateDecision::from_window(RateCategory::Auth, snapshot, 1_200_000);
        assert!(!decision.admitted);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.limit, 5);
    }

    #[test]
    fn fresh_window_leaves_limit_minus_one() {
        let snapshot = WindowSnapshot {
            count: 1,
            oldest_ms: Some(2_000_000),
        };
        let decision = RateDecision::from_window(RateCategory::Api, snapshot, 2_000_000);
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 9);
        // 重置点 = 最早事件 + 窗口时长
        assert_eq!(decision.reset_at, 2_000 + 10);
    }

    #[test]
    fn decision_headers_carry_all_three_fields() {
        let decision = RateDecision {
            admitted: false,
            limit: 5,
            remaining: 0,
            reset_at: 1_700_000_000,
        };
        let headers = decision.headers();
        assert_eq!(headers[0], ("x-ratelimit-limit", "5".to_string()));
        assert_eq!(headers[1], ("x-ratelimit-remaining", "0".to_string()));
        assert_eq!(headers[2], ("x-ratelimit-reset", "1700000000".to_string()));
    }

    #[tokio::test]
    async fn unconfigured_backend_fails_open() {
        let limiter = unconfigured_limiter();
        for _ in 0..20 {
            let decision = limiter
                .check_rate_limit("1.2.3.4", RateCategory::Auth)
                .await;
            assert!(decision.admitted);
            assert_eq!(decision.limit, 0);
            assert_eq!(decision.remaining, 0);
            assert_eq!(decision.reset_at, 0);
        }
    }

    #[test]
    fn client_ip_prefers_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "1.2.3.4".parse().unwrap());
        headers.insert("x-forwarded-for", "5.6.7.8, 9.9.9.9".parse().unwrap());
        assert_eq!(client_ip(&headers, None), "1.2.3.4");
    }

    #[test]
    fn client_ip_takes_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "5.6.7.8, 9.9.9.9".parse().unwrap());
        assert_eq!(client_ip(&headers, None), "5.6.7.8");
    }

    #[test]
    fn client_ip_falls_back_to_peer_then_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(
            client_ip(&headers, Some("10.0.0.1".parse().unwrap())),
            "10.0.0.1"
        );
        assert_eq!(client_ip(&headers, None), "anonymous");
    }
}
