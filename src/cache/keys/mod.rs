/// 缓存键模块
/// 提供各种缓存键生成函数
///
/// 键名约定：`<领域复数蛇形名>[:<限定符>]`，写入某领域后
/// 用裸领域名作前缀失效，即可把该领域全部缓存视图一起清掉

// 仪表盘缓存键模块
pub mod dashboard_keys;

// 报价单缓存键模块
pub mod quote_keys;

// 订阅者缓存键模块
pub mod newsletter_keys;

// 用户缓存键模块
pub mod user_keys;

// 限流计数键模块
pub mod rate_limit_keys;

// 重新导出常用的键生成函数
pub use dashboard_keys::{DASHBOARD_PREFIX, dashboard_activities_key, dashboard_stats_key};
pub use newsletter_keys::{NEWSLETTER_PREFIX, newsletter_page_key, newsletter_stats_key};
pub use quote_keys::{QUOTES_PREFIX, quote_page_key, quote_stats_key};
pub use rate_limit_keys::rate_limit_window_key;
pub use user_keys::{USERS_PREFIX, user_page_key};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_keys_share_their_domain_prefix() {
        assert!(quote_stats_key().starts_with(QUOTES_PREFIX));
        assert!(quote_page_key(2, 20).starts_with(QUOTES_PREFIX));
        assert!(newsletter_stats_key().starts_with(NEWSLETTER_PREFIX));
        assert!(newsletter_page_key(1, 20).starts_with(NEWSLETTER_PREFIX));
        assert!(dashboard_stats_key().starts_with(DASHBOARD_PREFIX));
        assert!(dashboard_activities_key(0, 20).starts_with(DASHBOARD_PREFIX));
        assert!(user_page_key(1, 20).starts_with(USERS_PREFIX));
    }

    #[test]
    fn domain_prefixes_do_not_overlap() {
        // "quotes" 前缀失效不能扫到其他领域
        for prefix in [NEWSLETTER_PREFIX, DASHBOARD_PREFIX, USERS_PREFIX] {
            assert!(!prefix.starts_with(QUOTES_PREFIX));
        }
    }

    #[test]
    fn page_keys_are_distinct_per_page() {
        assert_ne!(quote_page_key(1, 20), quote_page_key(2, 20));
        assert_ne!(dashboard_activities_key(0, 20), dashboard_activities_key(20, 20));
    }

    #[test]
    fn rate_limit_keys_separate_category_and_identity() {
        let a = rate_limit_window_key("auth", "1.2.3.4");
        let b = rate_limit_window_key("auth", "5.6.7.8");
        let c = rate_limit_window_key("api", "1.2.3.4");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, "rate_limit:auth:1.2.3.4");
    }
}
