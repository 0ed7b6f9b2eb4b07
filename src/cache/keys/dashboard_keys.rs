/// 仪表盘缓存键前缀
pub const DASHBOARD_PREFIX: &str = "dashboard";

/// 生成仪表盘总览统计键
pub fn dashboard_stats_key() -> String {
    format!("{}:stats", DASHBOARD_PREFIX)
}

/// 生成仪表盘活动流分页键
pub fn dashboard_activities_key(offset: i64, limit: i64) -> String {
    format!("{}:activities:{}:{}", DASHBOARD_PREFIX, offset, limit)
}
