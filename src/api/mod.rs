// API 数据传输对象
pub mod schema;
