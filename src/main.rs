use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tasks_backend::{
    AppState,
    cache::{InMemoryRateLimitStore, RateLimitStore, RedisRateLimitStore},
    config::{Config, RateLimitBackend},
    jobs::{self, JobContext},
    mail::{ConsoleMailer, Mailer},
    middleware::RateLimiter,
    router::build_router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    let store: Arc<dyn RateLimitStore> = match config.rate_limit_backend {
        RateLimitBackend::Redis => {
            let redis_client = redis::Client::open(config.redis_url.clone())
                .expect("Failed to create Redis client");
            Arc::new(RedisRateLimitStore::new(redis_client))
        }
        RateLimitBackend::Memory => {
            tracing::warn!("Using in-process rate limit store; limits are not shared between instances");
            Arc::new(InMemoryRateLimitStore::new())
        }
    };
    tracing::info!(
        request_limit = config.rate_limit.request_limit,
        window_secs = config.rate_limit.time_window_seconds,
        fail_open = config.rate_limit.fail_open,
        "rate limiting enabled"
    );
    let rate_limiter = Arc::new(RateLimiter::new(store, config.rate_limit));

    let mailer: Arc<dyn Mailer> = Arc::new(ConsoleMailer);

    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        mailer: mailer.clone(),
    };

    jobs::spawn_scheduler(
        JobContext {
            pool,
            mailer,
            from_email: config.default_from_email.clone(),
            reminder_window: chrono::Duration::hours(config.reminder_window_hours),
        },
        config.job_interval(),
    );

    let app = build_router(state, rate_limiter);

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
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
