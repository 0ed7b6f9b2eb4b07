/// 滑动窗口计数快照
///
/// 一次限流检查后窗口内的事件数与最早事件时间，
/// 计数本身由 Redis 维护，这里只是读取结果
#[derive(Debug, Clone, Copy)]
pub struct WindowSnapshot {
    /// 当前窗口内的请求数（含本次）
    pub count: i64,
    /// 窗口内最早一次请求的毫秒时间戳
    pub oldest_ms: Option<i64>,
}
