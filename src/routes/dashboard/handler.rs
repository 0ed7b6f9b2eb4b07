use axum::{Json, extract::State};

use crate::{
    AppState,
    cache::{keys::dashboard_stats_key, ttl},
    utils::{ApiResponse, error_codes, error_to_api_response, success_to_api_response},
};

use super::model::DashboardStats;

/// 仪表盘总览，统计级缓存
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<DashboardStats>> {
    let pool = state.pool.clone();
    let key = dashboard_stats_key();
    match state
        .cache
        .cached_query(&key, ttl::STATS, || async move {
            DashboardStats::load(&pool).await
        })
        .await
    {
        Ok(stats) => success_to_api_response(stats),
        Err(e) => {
            tracing::error!("查询仪表盘统计失败: {:?}", e);
            error_to_api_response(error_codes::INTERNAL_ERROR, "获取仪表盘统计失败".to_string())
        }
    }
}
