use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{
    AppState,
    cache::{keys::dashboard_activities_key, ttl},
    routes::activity::model::{ActivityEntry, ActivityLog},
    utils::{ApiResponse, error_codes, error_to_api_response, success_to_api_response},
};

// 活动流查询参数
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    offset: Option<i64>,
    limit: Option<i64>,
}

/// 管理端最近活动流，带实时级缓存
pub async fn find_recent_activities(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Json<ApiResponse<Vec<ActivityEntry>>> {
    let offset = query.offset.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let key = dashboard_activities_key(offset, limit);
    let pool = state.pool.clone();
    match state
        .cache
        .cached_query(&key, ttl::REALTIME, || async move {
            ActivityLog::find_recent(&pool, offset, limit).await
        })
        .await
    {
        Ok(activities) => success_to_api_response(activities),
        Err(err) => {
            tracing::error!("查询最近活动错误: {:?}", err);
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取最近活动失败".into())
        }
    }
}
