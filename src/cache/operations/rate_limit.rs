use redis::aio::MultiplexedConnection;
use uuid::Uuid;

use crate::cache::models::rate_limit::WindowSnapshot;

/// 速率限制缓存操作
///
/// 每个（标识，类别）键对应一个有序集合，成员是单次请求事件，
/// 分数是毫秒时间戳。一条 MULTI 流水线内完成清扫过期事件、
/// 记录本次事件、读取计数和最早事件，本进程不做读改写。
pub struct RateLimitCacheOperations;

impl RateLimitCacheOperations {
    /// 记录一次请求并返回窗口快照
    ///
    /// 无论最终放行与否计数都会加一，这是准入判定的一部分
    pub async fn record_hit(
        conn: &mut MultiplexedConnection,
        key: &str,
        window_secs: u64,
        now_ms: i64,
    ) -> Result<WindowSnapshot, redis::RedisError> {
        let window_start = now_ms - (window_secs as i64) * 1000;
        // 同一毫秒内的并发请求也要各算一次
        let member = format!("{}-{}", now_ms, Uuid::new_v4());

        let (count, oldest): (i64, Vec<(String, i64)>) = redis::pipe()
            .atomic()
            .zrembyscore(key, 0, window_start)
            .ignore()
            .zadd(key, member, now_ms)
            .ignore()
            .zcard(key)
            .zrange_withscores(key, 0, 0)
            .expire(key, window_secs as i64)
            .ignore()
            .query_async(conn)
            .await?;

        Ok(WindowSnapshot {
            count,
            oldest_ms: oldest.first().map(|(_, score)| *score),
        })
    }
}
