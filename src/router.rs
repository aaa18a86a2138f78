use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{RateLimiter, auth_middleware, log_errors, rate_limit},
    routes,
};

/// Assembles the full API. The rate limiter sits outermost so a denied
/// request never reaches authentication or a handler.
pub fn build_router(state: AppState, rate_limiter: Arc<RateLimiter>) -> Router {
    let public_routes = Router::new()
        .route("/users", post(routes::user::register))
        .route("/auth/token", post(routes::user::obtain_token))
        .route("/auth/token/refresh", post(routes::user::refresh_token));

    let protected_routes = Router::new()
        .route(
            "/tasks",
            get(routes::task::list_tasks).post(routes::task::create_task),
        )
        .route(
            "/tasks/{task_id}",
            get(routes::task::get_task)
                .put(routes::task::update_task)
                .delete(routes::task::delete_task),
        )
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    let api = Router::new().merge(public_routes).merge(protected_routes);

    // axum refuses to nest at the root
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    let router = router
        .layer(from_fn(log_errors))
        .layer(from_fn_with_state(rate_limiter, rate_limit));

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
