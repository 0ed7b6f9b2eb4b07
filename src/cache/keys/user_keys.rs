/// 用户缓存键前缀
pub const USERS_PREFIX: &str = "users";

/// 生成用户列表分页键
pub fn user_page_key(page: u32, page_size: u32) -> String {
    format!("{}:list:{}:{}", USERS_PREFIX, page, page_size)
}
