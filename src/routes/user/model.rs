use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::utils::hash_password;

/// 连续失败次数达到该值后锁定账号
pub const MAX_LOGIN_ATTEMPTS: i32 = 5;
/// 锁定时长
pub const LOCKOUT_MINUTES: i64 = 15;

#[derive(Debug, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub failed_login_attempts: i32,
    #[serde(skip_serializing)]
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 管理端用户列表条目，可进缓存
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub role: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivityFeedQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub async fn create(
        pool: &PgPool,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<Self, sqlx::Error> {
        let password_hash = hash_password(password)
            .map_err(|e| sqlx::Error::Protocol(format!("Failed to hash password: {}", e)))?;

        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, role, password_hash, failed_login_attempts, locked_until, created_at
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, password_hash, failed_login_attempts, locked_until, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, role, password_hash, failed_login_attempts, locked_until, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// 是否处于登录锁定期
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// 记一次登录失败，达到上限时锁定账号
    pub async fn record_failed_login(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let attempts = self.failed_login_attempts + 1;
        let locked_until = if attempts >= MAX_LOGIN_ATTEMPTS {
            Some(Utc::now() + Duration::minutes(LOCKOUT_MINUTES))
        } else {
            None
        };
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = $1, locked_until = $2
            WHERE id = $3
            "#,
        )
        .bind(attempts)
        .bind(locked_until)
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// 登录成功后清零失败计数
    pub async fn reset_login_attempts(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_attempts = 0, locked_until = NULL
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_page(
        pool: &PgPool,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<UserSummary>, sqlx::Error> {
        let offset = (page.saturating_sub(1) as i64) * page_size as i64;
        sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT id, email, name, role, created_at
            FROM users
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
    }
}
