use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState,
    cache::{
        keys::{NEWSLETTER_PREFIX, newsletter_page_key, newsletter_stats_key},
        ttl,
    },
    middleware::{RateCategory, client_ip},
    routes::activity::{ActivityLog, activity_types},
    utils::{
        ApiResponse, PaginatedResponse, Pagination, error_codes, error_to_api_response,
        generate_unsubscribe_token, success_to_api_response,
    },
};

use super::model::{
    NewsletterStats, SubscribeRequest, SubscribeResponse, Subscriber, UnsubscribeRequest,
};

type RateLimited<T> = (
    StatusCode,
    [(&'static str, String); 3],
    Json<ApiResponse<T>>,
);

/// 公开订阅入口，newsletter 类别限流
#[axum::debug_handler]
pub async fn subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubscribeRequest>,
) -> RateLimited<SubscribeResponse> {
    let ip = client_ip(&headers, None);
    let decision = state
        .limiter
        .check_rate_limit(&ip, RateCategory::Newsletter)
        .await;
    if !decision.admitted {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            decision.headers(),
            error_to_api_response(error_codes::RATE_LIMIT, "订阅过于频繁，请稍后重试".to_string()),
        );
    }

    let email = req.email.trim().to_lowercase();
    if !email.contains('@') || email.len() > 254 {
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::VALIDATION_ERROR, "邮箱格式无效".to_string()),
        );
    }

    let existing = match Subscriber::find_by_email(&state.pool, &email).await {
        Ok(existing) => existing,
        Err(e) => {
            tracing::error!("查询订阅者失败: {:?}", e);
            return (
                StatusCode::OK,
                decision.headers(),
                error_to_api_response(error_codes::INTERNAL_ERROR, "订阅失败".to_string()),
            );
        }
    };

    let result = match existing {
        Some(subscriber) if subscriber.is_active => {
            return (
                StatusCode::OK,
                decision.headers(),
                error_to_api_response(error_codes::ALREADY_SUBSCRIBED, "该邮箱已订阅".to_string()),
            );
        }
        // 退订过的地址重新激活
        Some(subscriber) => subscriber.reactivate(&state.pool).await,
        None => {
            let token = generate_unsubscribe_token(&email, &state.config.jwt_secret);
            Subscriber::insert(
                &state.pool,
                &email,
                req.first_name.as_deref(),
                req.last_name.as_deref(),
                &token,
            )
            .await
        }
    };

    match result {
        Ok(subscriber) => {
            ActivityLog::record(
                &state.pool,
                None,
                activity_types::NEWSLETTER_SUBSCRIBE,
                None,
                "新增订阅",
                Some(&subscriber.email),
                Some("newsletter"),
                Some(serde_json::json!({ "ip": ip })),
            )
            .await;
            state.cache.invalidate_pattern(NEWSLETTER_PREFIX).await;
            (
                StatusCode::OK,
                decision.headers(),
                success_to_api_response(SubscribeResponse {
                    email: subscriber.email,
                    unsubscribe_token: subscriber.unsubscribe_token,
                }),
            )
        }
        Err(e) => {
            tracing::error!("写入订阅者失败: {:?}", e);
            (
                StatusCode::OK,
                decision.headers(),
                error_to_api_response(error_codes::INTERNAL_ERROR, "订阅失败".to_string()),
            )
        }
    }
}

/// 凭退订令牌退订
#[axum::debug_handler]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<UnsubscribeRequest>,
) -> Json<ApiResponse<()>> {
    match Subscriber::unsubscribe_by_token(&state.pool, &req.token).await {
        Ok(Some(subscriber)) => {
            ActivityLog::record(
                &state.pool,
                None,
                activity_types::NEWSLETTER_UNSUBSCRIBE,
                None,
                "订阅退订",
                Some(&subscriber.email),
                Some("newsletter"),
                None,
            )
            .await;
            state.cache.invalidate_pattern(NEWSLETTER_PREFIX).await;
            success_to_api_response(())
        }
        Ok(None) => error_to_api_response(error_codes::NOT_FOUND, "退订令牌无效".to_string()),
        Err(e) => {
            tracing::error!("退订失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "退订失败".to_string())
        }
    }
}

// 管理端订阅者列表查询参数
#[derive(Debug, serde::Deserialize)]
pub struct ListSubscribersQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

/// 管理端订阅者列表，分页缓存
pub async fn list_subscribers(
    State(state): State<AppState>,
    Query(query): Query<ListSubscribersQuery>,
) -> Json<ApiResponse<PaginatedResponse<Subscriber>>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);

    let key = newsletter_page_key(page, page_size);
    let pool = state.pool.clone();
    let result = state
        .cache
        .cached_query(&key, ttl::SHORT, || async move {
            let (items, total) = futures_util::try_join!(
                Subscriber::list_page(&pool, page, page_size),
                Subscriber::count(&pool),
            )?;
            Ok::<_, sqlx::Error>(PaginatedResponse {
                items,
                pagination: Pagination {
                    page,
                    page_size,
                    total: total as u64,
                },
            })
        })
        .await;

    match result {
        Ok(page) => success_to_api_response(page),
        Err(e) => {
            tracing::error!("查询订阅者列表失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取订阅者列表失败".to_string())
        }
    }
}

/// 管理端订阅统计，短缓存
pub async fn get_newsletter_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<NewsletterStats>> {
    let pool = state.pool.clone();
    let key = newsletter_stats_key();
    match state
        .cache
        .cached_query(&key, ttl::SHORT, || async move {
            Subscriber::stats(&pool).await
        })
        .await
    {
        Ok(stats) => success_to_api_response(stats),
        Err(e) => {
            tracing::error!("查询订阅统计失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取订阅统计失败".to_string())
        }
    }
}
