use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Everything under `/account`. The route guard redirects anonymous visitors
/// to `/login`, so handlers here can rely on the `AuthSession` extractor.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /account
        .route("/account", get(handlers::get_account))
}
