use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    #[serde(skip_serializing)]
    #[serde(default)]
    pub unsubscribe_token: String,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewsletterStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
    pub new_this_week: i64,
    pub new_this_month: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub email: String,
    pub unsubscribe_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub token: String,
}

const SUBSCRIBER_COLUMNS: &str = r#"
    id, email, first_name, last_name, is_active,
    unsubscribe_token, subscribed_at, unsubscribed_at
"#;

impl Subscriber {
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM newsletter_subscribers WHERE email = $1",
            SUBSCRIBER_COLUMNS
        );
        sqlx::query_as::<_, Subscriber>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert(
        pool: &PgPool,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        unsubscribe_token: &str,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO newsletter_subscribers (email, first_name, last_name, unsubscribe_token)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SUBSCRIBER_COLUMNS
        );
        sqlx::query_as::<_, Subscriber>(&sql)
            .bind(email)
            .bind(first_name)
            .bind(last_name)
            .bind(unsubscribe_token)
            .fetch_one(pool)
            .await
    }

    /// 退订后重新订阅：重置激活状态和订阅时间
    pub async fn reactivate(&self, pool: &PgPool) -> Result<Self, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE newsletter_subscribers
            SET is_active = TRUE, subscribed_at = NOW(), unsubscribed_at = NULL
            WHERE id = $1
            RETURNING {}
            "#,
            SUBSCRIBER_COLUMNS
        );
        sqlx::query_as::<_, Subscriber>(&sql)
            .bind(self.id)
            .fetch_one(pool)
            .await
    }

    pub async fn unsubscribe_by_token(
        pool: &PgPool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE newsletter_subscribers
            SET is_active = FALSE, unsubscribed_at = NOW()
            WHERE unsubscribe_token = $1 AND is_active = TRUE
            RETURNING {}
            "#,
            SUBSCRIBER_COLUMNS
        );
        sqlx::query_as::<_, Subscriber>(&sql)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_page(
        pool: &PgPool,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let offset = (page.saturating_sub(1) as i64) * page_size as i64;
        let sql = format!(
            r#"
            SELECT {}
            FROM newsletter_subscribers
            ORDER BY subscribed_at DESC
            LIMIT $1 OFFSET $2
            "#,
            SUBSCRIBER_COLUMNS
        );
        sqlx::query_as::<_, Subscriber>(&sql)
            .bind(page_size as i64)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM newsletter_subscribers")
            .fetch_one(pool)
            .await
    }

    /// 订阅统计，各子查询并发执行
    pub async fn stats(pool: &PgPool) -> Result<NewsletterStats, sqlx::Error> {
        let now = Utc::now();
        let week_ago = now - Duration::days(7);
        let month_start = month_start(now);

        let (total, active, inactive, new_this_week, new_this_month) = futures_util::try_join!(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM newsletter_subscribers")
                .fetch_one(pool),
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM newsletter_subscribers WHERE is_active = TRUE"
            )
            .fetch_one(pool),
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM newsletter_subscribers WHERE is_active = FALSE"
            )
            .fetch_one(pool),
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM newsletter_subscribers WHERE subscribed_at >= $1"
            )
            .bind(week_ago)
            .fetch_one(pool),
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM newsletter_subscribers WHERE subscribed_at >= $1"
            )
            .bind(month_start)
            .fetch_one(pool),
        )?;

        Ok(NewsletterStats {
            total,
            active,
            inactive,
            new_this_week,
            new_this_month,
        })
    }
}

/// 当月一号零点
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_start_truncates_to_first_day() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 15, 30, 45).unwrap();
        let start = month_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn serialized_subscriber_hides_token() {
        let subscriber = Subscriber {
            id: 1,
            email: "a@b.com".into(),
            first_name: None,
            last_name: None,
            is_active: true,
            unsubscribe_token: "deadbeef".into(),
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        };
        let json = serde_json::to_value(&subscriber).unwrap();
        assert!(json.get("unsubscribe_token").is_none());
        assert_eq!(json["is_active"], true);
    }
}
