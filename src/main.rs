use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use bzion_backend::{
    AppState,
    cache::CacheStore,
    config::Config,
    middleware::{RateLimiter, api_rate_limit, auth_middleware, log_errors, require_admin},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'bzion_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    // 限流与缓存后端都是惰性构造、可缺省的
    let cache = Arc::new(CacheStore::new(&config));
    let limiter = Arc::new(RateLimiter::new(&config));
    if !config.ratelimit_redis_url.as_deref().unwrap_or("").is_empty() {
        tracing::info!("Rate limiting backend configured");
    } else {
        tracing::warn!("Rate limiting backend not configured, requests will not be throttled");
    }

    // 设置应用状态
    let state = AppState {
        pool,
        config: config.clone(),
        cache,
        limiter,
    };

    // 公开路由，各 handler 内部按类别限流
    let public_routes = Router::new()
        .route("/users/register", post(routes::user::register))
        .route("/users/login", post(routes::user::login))
        .route("/quotes/submit", post(routes::quote::submit_quote))
        .route("/newsletter/subscribe", post(routes::newsletter::subscribe))
        .route(
            "/newsletter/unsubscribe",
            post(routes::newsletter::unsubscribe),
        )
        .route("/forms/submit", post(routes::forms::submit_form));

    // 需要认证的账户路由
    let account_routes = Router::new()
        .route("/users/me", get(routes::user::get_profile))
        .route("/users/activities", get(routes::user::get_my_activities))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // 管理后台路由：从外到内依次是 api 限流、认证、角色检查
    let admin_routes = Router::new()
        .route(
            "/admin/dashboard/stats",
            get(routes::dashboard::get_dashboard_stats),
        )
        .route("/admin/quotes", get(routes::quote::list_quotes))
        .route("/admin/quotes/stats", get(routes::quote::get_quote_stats))
        .route(
            "/admin/quotes/status",
            put(routes::quote::update_quote_status),
        )
        .route(
            "/admin/newsletter",
            get(routes::newsletter::list_subscribers),
        )
        .route(
            "/admin/newsletter/stats",
            get(routes::newsletter::get_newsletter_stats),
        )
        .route(
            "/admin/activities",
            get(routes::activity::find_recent_activities),
        )
        .route("/admin/users", get(routes::user::list_users))
        .layer(axum::middleware::from_fn(require_admin))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            api_rate_limit,
        ));

    // 创建基础路由
    let router = Router::new().nest(
        &config.api_base_uri.clone(),
        Router::new()
            .merge(public_routes)
            .merge(account_routes)
            .merge(admin_routes),
    );

    // 添加日志中间件
    let router = router.layer(
        tower::ServiceBuilder::new().layer(axum::middleware::from_fn(log_errors)),
    );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
