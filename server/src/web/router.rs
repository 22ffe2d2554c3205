use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use tower_http::cors::{Any, CorsLayer};

use super::app_state::AppState;
use super::rate_limit::api_rate_limit;
use super::rest_api;

/// Build the axum router with all HTTP routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Restrict CORS to the configured public_url origin (or allow any for localhost dev)
    let cors = if state.auth_config.is_local() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origin = state
            .auth_config
            .public_url
            .parse::<HeaderValue>()
            .unwrap_or_else(|_| HeaderValue::from_static("https://localhost"));
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let rate_limiters = state.rate_limiters.clone();

    let api_routes = Router::new()
        .route(
            "/api/servers",
            get(rest_api::list_servers).post(rest_api::create_server),
        )
        .route("/api/me/servers", get(rest_api::list_my_servers))
        .route(
            "/api/servers/{server_id}",
            get(rest_api::get_server)
                .patch(rest_api::update_server)
                .delete(rest_api::delete_server),
        )
        .route(
            "/api/servers/{server_id}/join",
            post(rest_api::join_server),
        )
        .route(
            "/api/servers/{server_id}/leave",
            post(rest_api::leave_server),
        )
        .route(
            "/api/servers/{server_id}/join-code",
            post(rest_api::regenerate_join_code),
        )
        .route(
            "/api/servers/{server_id}/members/{member_id}/role",
            put(rest_api::update_member_role),
        )
        .route(
            "/api/servers/{server_id}/members/{member_id}",
            delete(rest_api::remove_member),
        )
        .layer(axum::middleware::from_fn(api_rate_limit));

    Router::new()
        .route("/api/health", get(rest_api::health))
        .merge(api_routes)
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(cors)
        // Inject rate limiters into all request extensions
        .layer(axum::Extension(rate_limiters))
        .with_state(state)
}
