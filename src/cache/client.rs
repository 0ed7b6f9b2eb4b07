use std::sync::{Arc, OnceLock};

use redis::{Client as RedisClient, IntoConnectionInfo, aio::MultiplexedConnection};

/// 惰性初始化的 Redis 后端句柄
///
/// 配置缺失或格式错误时不报错，整个进程按"未配置"降级运行：
/// 调用方拿到 None 后自行放行/回源。首次使用时构造客户端并缓存，
/// 并发首用时重复构造是幂等的，OnceLock 保证只保留一份。
pub struct RedisBackend {
    label: &'static str,
    url: Option<String>,
    token: Option<String>,
    client: OnceLock<Option<Arc<RedisClient>>>,
}

impl RedisBackend {
    pub fn new(label: &'static str, url: Option<String>, token: Option<String>) -> Self {
        Self {
            label,
            url,
            token,
            client: OnceLock::new(),
        }
    }

    /// 绕过环境配置直接注入客户端，测试和嵌入场景使用
    pub fn with_client(label: &'static str, client: RedisClient) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Some(Arc::new(client)));
        Self {
            label,
            url: None,
            token: None,
            client: cell,
        }
    }

    pub fn client(&self) -> Option<Arc<RedisClient>> {
        self.client.get_or_init(|| self.build()).clone()
    }

    pub fn is_configured(&self) -> bool {
        self.client().is_some()
    }

    /// 每次调用取一条多路复用连接；连接失败按未配置处理
    pub async fn connection(&self) -> Option<MultiplexedConnection> {
        let client = self.client()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!("[{}] Redis connection failed: {}", self.label, e);
                None
            }
        }
    }

    fn build(&self) -> Option<Arc<RedisClient>> {
        let url = self.url.as_deref().map(str::trim).unwrap_or("");
        let token = self.token.as_deref().map(str::trim).unwrap_or("");
        if url.is_empty() || token.is_empty() {
            return None;
        }

        // 只接受 redis 协议；rediss 为加密连接，其余一律视为未配置
        if !url.starts_with("rediss://") && !url.starts_with("redis://") {
            tracing::warn!(
                "[{}] backend URL must use redis:// or rediss:// scheme, got: {}",
                self.label,
                url
            );
            return None;
        }

        let mut info = match url.into_connection_info() {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("[{}] invalid backend URL: {}", self.label, e);
                return None;
            }
        };
        if info.redis.password.is_none() {
            info.redis.password = Some(token.to_string());
        }

        match RedisClient::open(info) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                tracing::warn!("[{}] failed to create Redis client: {}", self.label, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_means_not_configured() {
        let backend = RedisBackend::new("test", None, Some("token".into()));
        assert!(!backend.is_configured());
    }

    #[test]
    fn missing_token_means_not_configured() {
        let backend = RedisBackend::new("test", Some("rediss://db.example.com:6379".into()), None);
        assert!(!backend.is_configured());
    }

    #[test]
    fn blank_values_mean_not_configured() {
        let backend = RedisBackend::new("test", Some("   ".into()), Some("".into()));
        assert!(!backend.is_configured());
    }

    #[test]
    fn wrong_scheme_means_not_configured() {
        let backend = RedisBackend::new(
            "test",
            Some("https://db.example.com".into()),
            Some("token".into()),
        );
        assert!(!backend.is_configured());
    }

    #[test]
    fn well_formed_config_builds_a_client() {
        let backend = RedisBackend::new(
            "test",
            Some("rediss://db.example.com:6379".into()),
            Some("token".into()),
        );
        // 构造不触发连接，只校验配置
        assert!(backend.is_configured());
    }
}
