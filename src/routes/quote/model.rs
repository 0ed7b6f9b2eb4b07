use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// 报价单状态机：PENDING -> ACCEPTED | REJECTED
pub mod quote_status {
    pub const PENDING: &str = "PENDING";
    pub const ACCEPTED: &str = "ACCEPTED";
    pub const REJECTED: &str = "REJECTED";

    pub fn is_valid(status: &str) -> bool {
        matches!(status, PENDING | ACCEPTED | REJECTED)
    }

    /// 只有终态可以作为更新目标
    pub fn is_valid_transition_target(status: &str) -> bool {
        matches!(status, ACCEPTED | REJECTED)
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Quote {
    pub id: i64,
    pub quote_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub company_name: Option<String>,
    pub message: Option<String>,
    /// 报价条目，JSON 数组
    pub items: serde_json::Value,
    pub total_amount: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuoteStats {
    pub total: i64,
    pub pending: i64,
    pub accepted: i64,
    pub rejected: i64,
    pub total_value: f64,
    pub avg_value: f64,
}

#[derive(Debug, Deserialize)]
pub struct QuoteItemRequest {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuoteRequest {
    pub customer_name: String,
    pub customer_email: String,
    pub company_name: Option<String>,
    pub message: Option<String>,
    pub items: Vec<QuoteItemRequest>,
}

#[derive(Debug, Serialize)]
pub struct SubmitQuoteResponse {
    pub quote_number: String,
    pub total_amount: f64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuoteStatusRequest {
    pub id: i64,
    pub status: String,
}

/// 生成报价单编号，形如 Q-3F2A9C1B
pub fn generate_quote_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("Q-{}", id[..8].to_uppercase())
}

/// 金额合计，条目数量 × 单价
pub fn items_total(items: &[QuoteItemRequest]) -> f64 {
    items
        .iter()
        .map(|item| item.quantity as f64 * item.unit_price)
        .sum()
}

impl Quote {
    pub async fn create(
        pool: &PgPool,
        req: &SubmitQuoteRequest,
        quote_number: &str,
        total_amount: f64,
        items: serde_json::Value,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Quote>(
            r#"
            INSERT INTO quotes
                (quote_number, customer_name, customer_email, company_name, message, items, total_amount, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'PENDING')
            RETURNING id, quote_number, customer_name, customer_email, company_name, message,
                      items, total_amount, status, created_at, updated_at
            "#,
        )
        .bind(quote_number)
        .bind(&req.customer_name)
        .bind(&req.customer_email)
        .bind(&req.company_name)
        .bind(&req.message)
        .bind(items)
        .bind(total_amount)
        .fetch_one(pool)
        .await
    }

    pub async fn list_page(
        pool: &PgPool,
        status: Option<&str>,
        search: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let offset = (page.saturating_sub(1) as i64) * page_size as i64;
        let pattern = search.map(|s| format!("%{}%", s));
        sqlx::query_as::<_, Quote>(
            r#"
            SELECT id, quote_number, customer_name, customer_email, company_name, message,
                   items, total_amount, status, created_at, updated_at
            FROM quotes
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR customer_email ILIKE $2
                   OR customer_name ILIKE $2
                   OR company_name ILIKE $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(status)
        .bind(pattern)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count_filtered(
        pool: &PgPool,
        status: Option<&str>,
        search: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let pattern = search.map(|s| format!("%{}%", s));
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM quotes
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR customer_email ILIKE $2
                   OR customer_name ILIKE $2
                   OR company_name ILIKE $2)
            "#,
        )
        .bind(status)
        .bind(pattern)
        .fetch_one(pool)
        .await
    }

    /// 聚合统计，各子查询并发执行
    pub async fn stats(pool: &PgPool) -> Result<QuoteStats, sqlx::Error> {
        let (total, pending, accepted, rejected, value) = futures_util::try_join!(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quotes").fetch_one(pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quotes WHERE status = 'PENDING'")
                .fetch_one(pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quotes WHERE status = 'ACCEPTED'")
                .fetch_one(pool),
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quotes WHERE status = 'REJECTED'")
                .fetch_one(pool),
            sqlx::query_as::<_, (f64, f64)>(
                r#"
                SELECT COALESCE(SUM(total_amount), 0)::float8,
                       COALESCE(AVG(total_amount), 0)::float8
                FROM quotes
                "#,
            )
            .fetch_one(pool),
        )?;

        Ok(QuoteStats {
            total,
            pending,
            accepted,
            rejected,
            total_value: value.0,
            avg_value: value.1,
        })
    }

    pub async fn update_status(
        pool: &PgPool,
        id: i64,
        status: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Quote>(
            r#"
            UPDATE quotes
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, quote_number, customer_name, customer_email, company_name, message,
                      items, total_amount, status, created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_number_has_expected_shape() {
        let number = generate_quote_number();
        assert!(number.starts_with("Q-"));
        assert_eq!(number.len(), 10);
        assert!(number[2..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_ne!(number, generate_quote_number());
    }

    #[test]
    fn items_total_multiplies_quantity_by_price() {
        let items = vec![
            QuoteItemRequest {
                product_name: "轴承".into(),
                quantity: 3,
                unit_price: 10.5,
            },
            QuoteItemRequest {
                product_name: "齿轮".into(),
                quantity: 2,
                unit_price: 7.0,
            },
        ];
        assert!((items_total(&items) - 45.5).abs() < f64::EPSILON);
        assert_eq!(items_total(&[]), 0.0);
    }

    #[test]
    fn status_validation() {
        assert!(quote_status::is_valid("PENDING"));
        assert!(quote_status::is_valid_transition_target("ACCEPTED"));
        assert!(quote_status::is_valid_transition_target("REJECTED"));
        assert!(!quote_status::is_valid_transition_target("PENDING"));
        assert!(!quote_status::is_valid("CANCELLED"));
    }
}
