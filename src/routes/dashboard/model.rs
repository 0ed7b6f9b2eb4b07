use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::routes::{forms::FormSubmission, newsletter::Subscriber, quote::Quote, user::User};

/// 仪表盘总览聚合
#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardStats {
    pub users: i64,
    pub quotes_total: i64,
    pub quotes_pending: i64,
    pub quotes_value: f64,
    pub subscribers: i64,
    pub form_submissions: i64,
}

impl DashboardStats {
    /// 各子计数并发加载
    pub async fn load(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let (users, quote_stats, subscribers, form_submissions) = futures_util::try_join!(
            User::count(pool),
            Quote::stats(pool),
            Subscriber::count(pool),
            FormSubmission::count(pool),
        )?;

        Ok(DashboardStats {
            users,
            quotes_total: quote_stats.total,
            quotes_pending: quote_stats.pending,
            quotes_value: quote_stats.total_value,
            subscribers,
            form_submissions,
        })
    }
}
