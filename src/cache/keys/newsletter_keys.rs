/// 订阅者缓存键前缀
pub const NEWSLETTER_PREFIX: &str = "newsletter_subscribers";

/// 生成订阅统计键
pub fn newsletter_stats_key() -> String {
    format!("{}:stats", NEWSLETTER_PREFIX)
}

/// 生成订阅者列表分页键
pub fn newsletter_page_key(page: u32, page_size: u32) -> String {
    format!("{}:list:{}:{}", NEWSLETTER_PREFIX, page, page_size)
}
