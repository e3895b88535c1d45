use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Unprotected pages. `/login` is public too, but the route guard turns
/// signed-in visitors around before they reach it.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(handlers::health))
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login_page))
        // GET /api/session
        // Excluded from the guard by the matcher; does its own lookup and answers 401.
        .route("/api/session", get(handlers::get_api_session))
}
