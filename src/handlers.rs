use crate::{
    auth::{AuthProviderState, AuthSession},
    guard::PROTECTED_PREFIXES,
    models::{AdminOverview, SessionView},
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse},
};

// --- Public Pages ---

/// health
///
/// [Public Route] Liveness probe for load balancers.
#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health() -> &'static str {
    "ok"
}

pub async fn home() -> Html<&'static str> {
    Html("<h1>Welcome</h1><p><a href=\"/account\">Your account</a></p>")
}

/// login_page
///
/// [Public Route] Only anonymous visitors ever see this; the route guard
/// sends signed-in users home first.
pub async fn login_page() -> Html<&'static str> {
    Html("<h1>Sign in</h1>")
}

// --- Guarded Pages ---

/// get_account
///
/// [Protected Route] Returns the signed-in user's session.
#[utoipa::path(
    get,
    path = "/account",
    responses(
        (status = 200, description = "Current session", body = SessionView),
        (status = 307, description = "Anonymous visitor redirected to /login")
    )
)]
pub async fn get_account(AuthSession(session): AuthSession) -> Json<SessionView> {
    Json(SessionView::from(&session))
}

/// get_admin_overview
///
/// [Protected Route] Landing page of the admin area.
#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Admin overview", body = AdminOverview),
        (status = 307, description = "Anonymous visitor redirected to /login")
    )
)]
pub async fn get_admin_overview(AuthSession(session): AuthSession) -> Json<AdminOverview> {
    Json(AdminOverview {
        viewer: SessionView::from(&session),
        protected_prefixes: PROTECTED_PREFIXES.iter().map(|p| p.to_string()).collect(),
    })
}

// --- API ---

/// get_api_session
///
/// [API Route] API routes are excluded from the route guard, so this handler
/// asks the auth provider itself and answers 401 instead of redirecting.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current session", body = SessionView),
        (status = 401, description = "No session"),
        (status = 500, description = "Auth provider failure")
    )
)]
pub async fn get_api_session(
    State(auth): State<AuthProviderState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let client = auth.client_for(&headers);
    match client.get_session().await {
        Ok(Some(session)) => Ok(Json(SessionView::from(&session))),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!(error = %e, "session lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
