mod handler;
mod model;

pub use handler::get_dashboard_stats;
pub use model::DashboardStats;
