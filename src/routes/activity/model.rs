use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// 活动类型常量，入库时统一用蛇形小写
pub mod activity_types {
    pub const LOGIN: &str = "login";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const ACCOUNT_CREATED: &str = "account_created";
    pub const QUOTE_SUBMITTED: &str = "quote_submitted";
    pub const QUOTE_UPDATE: &str = "quote_update";
    pub const NEWSLETTER_SUBSCRIBE: &str = "newsletter_subscribe";
    pub const NEWSLETTER_UNSUBSCRIBE: &str = "newsletter_unsubscribe";
    pub const FORM_SUBMITTED: &str = "form_submitted";
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ActivityEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub activity_type: String,
    pub title: Option<String>,
    pub description: String,
    pub reference_id: Option<String>,
    pub reference_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// 活动日志服务
pub struct ActivityLog;

impl ActivityLog {
    /// 尽力而为的写入：失败只记日志，绝不让业务请求跟着失败
    pub async fn record(
        pool: &PgPool,
        user_id: Option<i64>,
        activity_type: &str,
        title: Option<&str>,
        description: &str,
        reference_id: Option<&str>,
        reference_type: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) {
        let result = sqlx::query(
            r#"
            INSERT INTO user_activities
                (user_id, activity_type, title, description, reference_id, reference_type, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user_id)
        .bind(activity_type)
        .bind(title)
        .bind(description)
        .bind(reference_id)
        .bind(reference_type)
        .bind(metadata)
        .execute(pool)
        .await;

        if let Err(e) = result {
            tracing::error!("Failed to log activity {}: {}", activity_type, e);
        }
    }

    pub async fn find_recent(
        pool: &PgPool,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT id, user_id, activity_type, title, description,
                   reference_id, reference_type, metadata, created_at
            FROM user_activities
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_user(
        pool: &PgPool,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, sqlx::Error> {
        sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT id, user_id, activity_type, title, description,
                   reference_id, reference_type, metadata, created_at
            FROM user_activities
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
