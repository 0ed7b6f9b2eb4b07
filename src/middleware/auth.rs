use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    AppState,
    utils::{error_codes, error_to_api_response, verify_token},
};

/// 已认证的调用方，认证中间件写入请求扩展
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "ADMIN"
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return unauthorized();
    };

    match verify_token(bearer.token(), &state.config) {
        Ok(claims) => {
            let Ok(id) = claims.sub.parse::<i64>() else {
                tracing::warn!("token sub is not a user id: {}", claims.sub);
                return unauthorized();
            };
            req.extensions_mut().insert(AuthUser {
                id,
                role: claims.role,
            });
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("token verification failed: {}", e);
            unauthorized()
        }
    }
}

/// 管理后台路由的角色闸，必须套在认证中间件之内
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin() => next.run(req).await,
        Some(_) => (
            StatusCode::FORBIDDEN,
            error_to_api_response::<()>(
                error_codes::PERMISSION_DENIED,
                "需要管理员权限".to_string(),
            ),
        )
            .into_response(),
        None => unauthorized(),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        error_to_api_response::<()>(error_codes::AUTH_FAILED, "未授权访问".to_string()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_role_check() {
        let admin = AuthUser {
            id: 1,
            role: "ADMIN".into(),
        };
        let user = AuthUser {
            id: 2,
            role: "USER".into(),
        };
        assert!(admin.is_admin());
        assert!(!user.is_admin());
    }
}
