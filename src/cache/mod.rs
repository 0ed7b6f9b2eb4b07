// 缓存模块
// 包含缓存数据结构和操作逻辑

pub mod client;
pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

// 重新导出常用类型和函数，方便其他模块使用
pub use client::RedisBackend;
pub use store::CacheStore;

/// 缓存过期时间（秒）
pub mod ttl {
    /// 实时数据，如仪表盘活动流
    pub const REALTIME: u64 = 10;
    /// 统计聚合
    pub const STATS: u64 = 30;
    pub const SHORT: u64 = 60;
    pub const MEDIUM: u64 = 300;
    pub const LONG: u64 = 3600;
    pub const DAY: u64 = 86400;
}
