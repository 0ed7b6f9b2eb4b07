use redis::AsyncCommands;
use serde::{Serialize, de::DeserializeOwned};

use crate::cache::client::RedisBackend;
use crate::config::Config;

/// 删除扫描出的键时的单批上限，避免一次 DEL 阻塞过久
const INVALIDATE_BATCH: usize = 512;
const SCAN_COUNT: usize = 200;

/// 旁路缓存访问器
///
/// 所有操作都不向调用方抛错：后端未配置或调用失败时读按未命中、
/// 写按丢弃处理，缓存故障只降低性能，不影响正确性。
pub struct CacheStore {
    backend: RedisBackend,
}

impl CacheStore {
    pub fn new(config: &Config) -> Self {
        Self {
            backend: RedisBackend::new(
                "cache",
                config.cache_redis_url.clone(),
                config.cache_redis_token.clone(),
            ),
        }
    }

    pub fn with_client(client: redis::Client) -> Self {
        Self {
            backend: RedisBackend::with_client("cache", client),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.backend.connection().await?;
        let raw: Option<String> = match conn.get(key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("cache get error for {}: {}", key, e);
                return None;
            }
        };
        let json = raw?;
        match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("cache deserialize error for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<u64>) {
        let Some(mut conn) = self.backend.connection().await else {
            return;
        };
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("cache serialize error for {}: {}", key, e);
                return;
            }
        };
        let result: Result<(), redis::RedisError> = match ttl {
            Some(secs) => conn.set_ex(key, json, secs).await,
            None => conn.set(key, json).await,
        };
        if let Err(e) = result {
            tracing::warn!("cache set error for {}: {}", key, e);
        }
    }

    pub async fn del(&self, key: &str) {
        let Some(mut conn) = self.backend.connection().await else {
            return;
        };
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!("cache del error for {}: {}", key, e);
        }
    }

    /// 按前缀批量失效：一个领域写入后把它所有缓存视图一起清掉
    ///
    /// 用 SCAN 游标分页枚举，分批删除，避免 KEYS 在大键量下阻塞
    pub async fn invalidate_pattern(&self, prefix: &str) {
        let Some(mut conn) = self.backend.connection().await else {
            return;
        };
        let pattern = format!("{}*", prefix);
        let mut cursor: u64 = 0;
        let mut batch: Vec<String> = Vec::new();
        loop {
            let scanned: Result<(u64, Vec<String>), redis::RedisError> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await;
            let (next, keys) = match scanned {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("cache invalidate scan error for {}: {}", prefix, e);
                    return;
                }
            };
            batch.extend(keys);
            if batch.len() >= INVALIDATE_BATCH {
                Self::del_batch(&mut conn, &mut batch, prefix).await;
            }
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        if !batch.is_empty() {
            Self::del_batch(&mut conn, &mut batch, prefix).await;
        }
    }

    async fn del_batch(
        conn: &mut redis::aio::MultiplexedConnection,
        batch: &mut Vec<String>,
        prefix: &str,
    ) {
        let keys = std::mem::take(batch);
        if let Err(e) = conn.del::<_, ()>(keys).await {
            tracing::warn!("cache invalidate del error for {}: {}", prefix, e);
        }
    }

    /// 读穿缓存：命中直接返回，未命中执行查询并写回
    ///
    /// 只有查询自身的错误会向上传递，缓存层错误一律当未命中
    pub async fn cached_query<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: u64,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            tracing::debug!("cache hit: {}", key);
            return Ok(hit);
        }
        tracing::debug!("cache miss: {}", key);
        let value = compute().await?;
        self.set(key, &value, Some(ttl)).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn unconfigured() -> CacheStore {
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
        CacheStore::new(&config)
    }

    #[tokio::test]
    async fn unconfigured_store_reads_as_miss() {
        let store = unconfigured();
        assert_eq!(store.get::<String>("quotes:stats").await, None);
    }

    #[tokio::test]
    async fn unconfigured_store_drops_writes_silently() {
        let store = unconfigured();
        store.set("quotes:stats", &42u32, Some(30)).await;
        store.del("quotes:stats").await;
        store.invalidate_pattern("quotes").await;
        assert_eq!(store.get::<u32>("quotes:stats").await, None);
    }

    #[tokio::test]
    async fn cached_query_falls_through_when_unconfigured() {
        let store = unconfigured();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value: Result<u32, sqlx::Error> = store
                .cached_query("quotes:stats", 30, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value.unwrap(), 7);
        }
        // 没有缓存后端时每次都回源
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cached_query_propagates_compute_errors() {
        let store = unconfigured();
        let result: Result<u32, String> = store
            .cached_query("quotes:stats", 30, || async { Err("db down".to_string()) })
            .await;
        assert_eq!(result.unwrap_err(), "db down");
    }
}
