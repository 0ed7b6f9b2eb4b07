/// 报价单缓存键前缀
pub const QUOTES_PREFIX: &str = "quotes";

/// 生成报价单统计键
pub fn quote_stats_key() -> String {
    format!("{}:stats", QUOTES_PREFIX)
}

/// 生成报价单列表分页键
pub fn quote_page_key(page: u32, page_size: u32) -> String {
    format!("{}:list:{}:{}", QUOTES_PREFIX, page, page_size)
}
