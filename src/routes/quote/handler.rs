use axum::{
    Json,
    extract::{Extension, Query, State},
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState,
    cache::{
        keys::{DASHBOARD_PREFIX, QUOTES_PREFIX, quote_page_key, quote_stats_key},
        ttl,
    },
    middleware::{AuthUser, RateCategory, client_ip},
    routes::activity::{ActivityLog, activity_types},
    utils::{
        ApiResponse, PaginatedResponse, Pagination, error_codes, error_to_api_response,
        success_to_api_response,
    },
};

use super::model::{
    Quote, QuoteStats, SubmitQuoteRequest, SubmitQuoteResponse, UpdateQuoteStatusRequest,
    generate_quote_number, items_total, quote_status,
};

type RateLimited<T> = (
    StatusCode,
    [(&'static str, String); 3],
    Json<ApiResponse<T>>,
);

/// 公开的询价提交入口，rfq 类别限流
#[axum::debug_handler]
pub async fn submit_quote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitQuoteRequest>,
) -> RateLimited<SubmitQuoteResponse> {
    let ip = client_ip(&headers, None);
    let decision = state.limiter.check_rate_limit(&ip, RateCategory::Rfq).await;
    if !decision.admitted {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            decision.headers(),
            error_to_api_response(error_codes::RATE_LIMIT, "询价提交过于频繁，请稍后重试".to_string()),
        );
    }

    if !req.customer_email.contains('@') {
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::VALIDATION_ERROR, "邮箱格式无效".to_string()),
        );
    }
    if req.items.is_empty() {
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::VALIDATION_ERROR, "报价条目不能为空".to_string()),
        );
    }

    let quote_number = generate_quote_number();
    let total_amount = items_total(&req.items);
    let items = serde_json::json!(
        req.items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "product_name": item.product_name,
                    "quantity": item.quantity,
                    "unit_price": item.unit_price,
                })
            })
            .collect::<Vec<_>>()
    );

    match Quote::create(&state.pool, &req, &quote_number, total_amount, items).await {
        Ok(quote) => {
            ActivityLog::record(
                &state.pool,
                None,
                activity_types::QUOTE_SUBMITTED,
                Some("新询价单"),
                "客户提交询价",
                Some(&quote.quote_number),
                Some("quote"),
                Some(serde_json::json!({ "ip": ip, "total_amount": quote.total_amount })),
            )
            .await;
            // 写入后清掉报价与仪表盘的全部缓存视图
            state.cache.invalidate_pattern(QUOTES_PREFIX).await;
            state.cache.invalidate_pattern(DASHBOARD_PREFIX).await;
            (
                StatusCode::OK,
                decision.headers(),
                success_to_api_response(SubmitQuoteResponse {
                    quote_number: quote.quote_number,
                    total_amount: quote.total_amount,
                    status: quote.status,
                }),
            )
        }
        Err(e) => {
            tracing::error!("创建询价单失败: {:?}", e);
            (
                StatusCode::OK,
                decision.headers(),
                error_to_api_response(error_codes::INTERNAL_ERROR, "提交询价失败".to_string()),
            )
        }
    }
}

// 管理端报价单列表查询参数
#[derive(Debug, serde::Deserialize)]
pub struct ListQuotesQuery {
    status: Option<String>,
    search: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

/// 管理端报价单列表；无筛选条件的分页走缓存
pub async fn list_quotes(
    State(state): State<AppState>,
    Query(query): Query<ListQuotesQuery>,
) -> Json<ApiResponse<PaginatedResponse<Quote>>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);
    let status = query.status.as_deref().filter(|s| !s.is_empty());
    let search = query.search.as_deref().filter(|s| !s.is_empty());

    if let Some(status) = status {
        if !quote_status::is_valid(status) {
            return error_to_api_response(
                error_codes::VALIDATION_ERROR,
                "无效的报价单状态".to_string(),
            );
        }
    }

    let result = if status.is_none() && search.is_none() {
        let key = quote_page_key(page, page_size);
        let pool = state.pool.clone();
        state
            .cache
            .cached_query(&key, ttl::REALTIME, || async move {
                load_page(&pool, None, None, page, page_size).await
            })
            .await
    } else {
        load_page(&state.pool, status, search, page, page_size).await
    };

    match result {
        Ok(page) => success_to_api_response(page),
        Err(e) => {
            tracing::error!("查询报价单列表失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取报价单列表失败".to_string())
        }
    }
}

async fn load_page(
    pool: &sqlx::PgPool,
    status: Option<&str>,
    search: Option<&str>,
    page: u32,
    page_size: u32,
) -> Result<PaginatedResponse<Quote>, sqlx::Error> {
    let (items, total) = futures_util::try_join!(
        Quote::list_page(pool, status, search, page, page_size),
        Quote::count_filtered(pool, status, search),
    )?;
    Ok(PaginatedResponse {
        items,
        pagination: Pagination {
            page,
            page_size,
            total: total as u64,
        },
    })
}

/// 管理端报价统计，短缓存
pub async fn get_quote_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<QuoteStats>> {
    let pool = state.pool.clone();
    let key = quote_stats_key();
    match state
        .cache
        .cached_query(&key, ttl::SHORT, || async move { Quote::stats(&pool).await })
        .await
    {
        Ok(stats) => success_to_api_response(stats),
        Err(e) => {
            tracing::error!("查询报价统计失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取报价统计失败".to_string())
        }
    }
}

/// 管理端更新报价单状态
#[axum::debug_handler]
pub async fn update_quote_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateQuoteStatusRequest>,
) -> Json<ApiResponse<Quote>> {
    if !quote_status::is_valid_transition_target(&req.status) {
        return error_to_api_response(
            error_codes::VALIDATION_ERROR,
            "状态只能更新为 ACCEPTED 或 REJECTED".to_string(),
        );
    }

    match Quote::update_status(&state.pool, req.id, &req.status).await {
        Ok(Some(quote)) => {
            ActivityLog::record(
                &state.pool,
                Some(auth.id),
                activity_types::QUOTE_UPDATE,
                None,
                "报价单状态更新",
                Some(&quote.quote_number),
                Some("quote"),
                Some(serde_json::json!({ "status": quote.status })),
            )
            .await;
            state.cache.invalidate_pattern(QUOTES_PREFIX).await;
            state.cache.invalidate_pattern(DASHBOARD_PREFIX).await;
            success_to_api_response(quote)
        }
        Ok(None) => error_to_api_response(error_codes::NOT_FOUND, "报价单不存在".to_string()),
        Err(e) => {
            tracing::error!("更新报价单状态失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "更新报价单失败".to_string())
        }
    }
}
