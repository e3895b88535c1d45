use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Everything under `/admin`. Like the account pages, access only requires a
/// session; there is no role check.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        .route("/admin", get(handlers::get_admin_overview))
}
