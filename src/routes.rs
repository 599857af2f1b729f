// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{self, controller, events, pool, room},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (pool, rooms, controllers).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store and realtime registries).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let controller_routes = Router::new()
        .route("/{controller}", axum::routing::delete(controller::detach))
        .route("/{controller}/activate", post(controller::activate))
        .route("/{controller}/samples", post(controller::submit_sample))
        .route("/{controller}/sensor", post(controller::report_sensor));

    let room_routes = Router::new()
        .route("/{room}", get(room::get_room))
        .route("/{room}/events", get(events::room_events))
        .route("/{room}/settings", post(room::save_settings))
        .route("/{room}/start", post(room::start_round))
        .route("/{room}/advance", post(room::advance))
        .route("/{room}/confirm", post(room::confirm_tally))
        .route("/{room}/history/{index}/toggle", post(room::toggle_history))
        .route("/{room}/reset", post(room::reset))
        .route(
            "/{room}/display",
            post(room::claim_display).delete(room::release_display),
        )
        .nest("/{room}/controllers", controller_routes);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/pool", get(pool::list_pool).put(pool::import_pool))
        .nest("/api/rooms", room_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
