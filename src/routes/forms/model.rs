use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// 允许的表单类型
pub const VALID_FORM_TYPES: &[&str] = &[
    "contact",
    "support",
    "partnership",
    "feedback",
    "demo_request",
];

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct FormSubmission {
    pub id: i64,
    pub form_type: String,
    pub email: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub ip_address: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitFormRequest {
    pub form_type: String,
    pub email: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmitFormResponse {
    pub id: i64,
}

impl FormSubmission {
    pub async fn create(
        pool: &PgPool,
        req: &SubmitFormRequest,
        ip_address: &str,
        user_agent: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, FormSubmission>(
            r#"
            INSERT INTO form_submissions
                (form_type, email, name, company_name, phone, message, metadata, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, form_type, email, name, company_name, phone, message,
                      metadata, ip_address, user_agent, created_at
            "#,
        )
        .bind(&req.form_type)
        .bind(&req.email)
        .bind(&req.name)
        .bind(&req.company_name)
        .bind(&req.phone)
        .bind(&req.message)
        .bind(&req.metadata)
        .bind(ip_address)
        .bind(user_agent)
        .fetch_one(pool)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM form_submissions")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_type_allow_list() {
        assert!(VALID_FORM_TYPES.contains(&"contact"));
        assert!(VALID_FORM_TYPES.contains(&"demo_request"));
        assert!(!VALID_FORM_TYPES.contains(&"spam"));
    }
}
