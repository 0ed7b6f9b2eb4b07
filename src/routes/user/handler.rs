use axum::{
    Json,
    extract::{Extension, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;

use crate::{
    AppState,
    cache::{keys::user_page_key, ttl},
    middleware::{AuthUser, RateCategory, client_ip},
    routes::activity::{ActivityLog, activity_types},
    utils::{
        ApiResponse, PaginatedResponse, Pagination, error_codes, error_to_api_response,
        generate_token, success_to_api_response,
    },
};

use super::model::{
    ActivityFeedQuery, LoginRequest, LoginResponse, ProfileResponse, RegisterRequest,
    RegisterResponse, User, UserSummary,
};

type RateLimited<T> = (
    StatusCode,
    [(&'static str, String); 3],
    Json<ApiResponse<T>>,
);

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> RateLimited<RegisterResponse> {
    let ip = client_ip(&headers, None);
    let decision = state.limiter.check_rate_limit(&ip, RateCategory::Auth).await;
    if !decision.admitted {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            decision.headers(),
            error_to_api_response(error_codes::RATE_LIMIT, "注册过于频繁，请稍后重试".to_string()),
        );
    }

    // 基本格式校验
    if !req.email.contains('@') || req.email.len() > 254 {
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::VALIDATION_ERROR, "邮箱格式无效".to_string()),
        );
    }
    if req.password.len() < 8 {
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::VALIDATION_ERROR, "密码至少8位".to_string()),
        );
    }

    match User::create(&state.pool, &req.email, &req.name, &req.password).await {
        Ok(user) => match generate_token(user.id, &user.role, &state.config) {
            Ok((token, _)) => {
                ActivityLog::record(
                    &state.pool,
                    Some(user.id),
                    activity_types::ACCOUNT_CREATED,
                    None,
                    "账号注册成功",
                    None,
                    None,
                    Some(serde_json::json!({ "ip": ip })),
                )
                .await;
                (
                    StatusCode::OK,
                    decision.headers(),
                    success_to_api_response(RegisterResponse {
                        user_id: user.id,
                        email: user.email,
                        name: user.name,
                        token,
                    }),
                )
            }
            Err(_) => (
                StatusCode::OK,
                decision.headers(),
                error_to_api_response(error_codes::INTERNAL_ERROR, "生成令牌失败".to_string()),
            ),
        },
        Err(e) => {
            if e.to_string().contains("unique constraint") {
                (
                    StatusCode::OK,
                    decision.headers(),
                    error_to_api_response(error_codes::USER_EXISTS, "邮箱已注册".to_string()),
                )
            } else {
                tracing::error!("创建用户失败: {:?}", e);
                (
                    StatusCode::OK,
                    decision.headers(),
                    error_to_api_response(error_codes::INTERNAL_ERROR, "创建用户失败".to_string()),
                )
            }
        }
    }
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> RateLimited<LoginResponse> {
    let ip = client_ip(&headers, None);
    let decision = state.limiter.check_rate_limit(&ip, RateCategory::Auth).await;
    if !decision.admitted {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            decision.headers(),
            error_to_api_response(error_codes::RATE_LIMIT, "登录尝试过于频繁，请稍后重试".to_string()),
        );
    }

    let user = match User::find_by_email(&state.pool, &req.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            // 不区分"用户不存在"与"密码错误"，避免枚举邮箱
            return (
                StatusCode::OK,
                decision.headers(),
                error_to_api_response(error_codes::AUTH_FAILED, "邮箱或密码错误".to_string()),
            );
        }
        Err(e) => {
            tracing::error!("查询用户失败: {:?}", e);
            return (
                StatusCode::OK,
                decision.headers(),
                error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string()),
            );
        }
    };

    if user.is_locked(Utc::now()) {
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(
                error_codes::ACCOUNT_LOCKED,
                "账号已临时锁定，请稍后重试".to_string(),
            ),
        );
    }

    let verified = crate::utils::verify_password(&req.password, &user.password_hash)
        .unwrap_or(false);
    if !verified {
        if let Err(e) = user.record_failed_login(&state.pool).await {
            tracing::error!("记录失败登录错误: {:?}", e);
        }
        ActivityLog::record(
            &state.pool,
            Some(user.id),
            activity_types::LOGIN_FAILED,
            None,
            "登录失败",
            None,
            None,
            Some(serde_json::json!({ "ip": ip })),
        )
        .await;
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::AUTH_FAILED, "邮箱或密码错误".to_string()),
        );
    }

    if let Err(e) = user.reset_login_attempts(&state.pool).await {
        tracing::error!("清零失败计数错误: {:?}", e);
    }

    match generate_token(user.id, &user.role, &state.config) {
        Ok((token, _)) => {
            ActivityLog::record(
                &state.pool,
                Some(user.id),
                activity_types::LOGIN,
                None,
                "登录成功",
                None,
                None,
                Some(serde_json::json!({ "ip": ip })),
            )
            .await;
            (
                StatusCode::OK,
                decision.headers(),
                success_to_api_response(LoginResponse {
                    user_id: user.id,
                    role: user.role,
                    token,
                }),
            )
        }
        Err(_) => (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::INTERNAL_ERROR, "生成令牌失败".to_string()),
        ),
    }
}

#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Json<ApiResponse<ProfileResponse>> {
    match User::find_by_id(&state.pool, auth.id).await {
        Ok(Some(user)) => success_to_api_response(ProfileResponse {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }),
        Ok(None) => error_to_api_response(error_codes::NOT_FOUND, "用户不存在".to_string()),
        Err(e) => {
            tracing::error!("查询用户失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "数据库错误".to_string())
        }
    }
}

/// 当前用户的活动历史
pub async fn get_my_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ActivityFeedQuery>,
) -> Json<ApiResponse<Vec<crate::routes::activity::ActivityEntry>>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    match ActivityLog::find_by_user(&state.pool, auth.id, limit).await {
        Ok(activities) => success_to_api_response(activities),
        Err(e) => {
            tracing::error!("查询用户活动失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取活动历史失败".to_string())
        }
    }
}

// 管理端用户列表查询参数
#[derive(Debug, serde::Deserialize)]
pub struct ListUsersQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

/// 管理端用户列表，分页缓存
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Json<ApiResponse<PaginatedResponse<UserSummary>>> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);

    let key = user_page_key(page, page_size);
    let pool = state.pool.clone();
    let result = state
        .cache
        .cached_query(&key, ttl::SHORT, || async move {
            let (items, total) = futures_util::try_join!(
                User::list_page(&pool, page, page_size),
                User::count(&pool),
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
            tracing::error!("查询用户列表失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取用户列表失败".to_string())
        }
    }
}
