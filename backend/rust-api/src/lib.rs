use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middlewares::trace::TRACE_ID_HEADER),
        ])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest(
            "/api/v1",
            gameplay_routes()
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::auth::optional_auth_middleware,
                ))
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::rate_limit::burst_limit_middleware,
                ))
                .merge(public_routes())
                .layer(cors),
        )
        .nest(
            "/admin",
            admin_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::admin_key_middleware,
            )),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn gameplay_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/guess", post(handlers::game::submit_guess))
        .route("/challenge", get(handlers::game::get_challenge))
        .route("/hint", post(handlers::game::request_hint))
        .route("/bonus/accept", post(handlers::game::accept_bonus))
        .route("/bonus/decline", post(handlers::game::decline_bonus))
}

fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/nickname/validate",
            post(handlers::players::validate_nickname),
        )
        .route("/attempts/recent", get(handlers::players::recent_attempts))
        .route("/leaderboard", get(handlers::leaderboard::day_leaderboard))
        .route(
            "/leaderboard/global",
            get(handlers::leaderboard::global_leaderboard),
        )
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/bans/cleanup", post(handlers::admin::cleanup_bans))
}
