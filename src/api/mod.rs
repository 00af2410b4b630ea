// API module - HTTP endpoints

pub mod admin;
pub mod auth;
pub mod flash;
pub mod health;
pub mod member;
pub mod middleware;
pub mod page;

use axum::{routing::get_service, Router};
use std::path::Path;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;

use crate::error::not_found;
use middleware::session::AppState;

/// Assembles every route with sessions, static assets and request tracing.
pub fn app(state: AppState, session_layer: SessionManagerLayer<SqliteStore>) -> Router {
    // Serve static assets from web/static
    let static_routes = Router::new().nest_service(
        "/static",
        get_service(ServeDir::new(Path::new("web").join("static"))),
    );

    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(admin::router())
        .merge(member::router())
        .merge(static_routes)
        .fallback(not_found)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
