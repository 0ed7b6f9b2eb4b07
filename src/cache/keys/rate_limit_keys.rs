/// 限流计数键前缀
const RATE_LIMIT_PREFIX: &str = "rate_limit:";

/// 生成限流滑动窗口键，按（类别，调用方标识）区分
pub fn rate_limit_window_key(category: &str, identifier: &str) -> String {
    format!("{}{}:{}", RATE_LIMIT_PREFIX, category, identifier)
}
