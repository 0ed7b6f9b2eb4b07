use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::{
    AppState,
    cache::keys::DASHBOARD_PREFIX,
    middleware::{RateCategory, client_ip},
    routes::activity::{ActivityLog, activity_types},
    utils::{ApiResponse, error_codes, error_to_api_response, success_to_api_response},
};

use super::model::{FormSubmission, SubmitFormRequest, SubmitFormResponse, VALID_FORM_TYPES};

type RateLimited<T> = (
    StatusCode,
    [(&'static str, String); 3],
    Json<ApiResponse<T>>,
);

/// 公开表单提交入口，api 类别限流
#[axum::debug_handler]
pub async fn submit_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmitFormRequest>,
) -> RateLimited<SubmitFormResponse> {
    let ip = client_ip(&headers, None);
    let decision = state.limiter.check_rate_limit(&ip, RateCategory::Api).await;
    if !decision.admitted {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            decision.headers(),
            error_to_api_response(error_codes::RATE_LIMIT, "表单提交过于频繁，请稍后重试".to_string()),
        );
    }

    if !VALID_FORM_TYPES.contains(&req.form_type.as_str()) {
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::VALIDATION_ERROR, "未知的表单类型".to_string()),
        );
    }
    if !req.email.contains('@') {
        return (
            StatusCode::OK,
            decision.headers(),
            error_to_api_response(error_codes::VALIDATION_ERROR, "邮箱格式无效".to_string()),
        );
    }

    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    match FormSubmission::create(&state.pool, &req, &ip, &user_agent).await {
        Ok(submission) => {
            ActivityLog::record(
                &state.pool,
                None,
                activity_types::FORM_SUBMITTED,
                None,
                "表单提交",
                Some(&submission.id.to_string()),
                Some("form"),
                Some(serde_json::json!({ "form_type": submission.form_type, "ip": ip })),
            )
            .await;
            state.cache.invalidate_pattern(DASHBOARD_PREFIX).await;
            (
                StatusCode::OK,
                decision.headers(),
                success_to_api_response(SubmitFormResponse { id: submission.id }),
            )
        }
        Err(e) => {
            tracing::error!("写入表单提交失败: {:?}", e);
            (
                StatusCode::OK,
                decision.headers(),
                error_to_api_response(error_codes::INTERNAL_ERROR, "表单提交失败".to_string()),
            )
        }
    }
}
