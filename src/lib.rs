use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod guard;
pub mod handlers;
pub mod matcher;
pub mod models;

pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{AuthProviderState, MockAuthProvider, SupabaseAuthProvider};
pub use config::AppConfig;
pub use guard::{Outcome, RouteGuard};
pub use matcher::Matcher;

/// ApiDoc
///
/// OpenAPI document for the host application, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health, handlers::get_account, handlers::get_admin_overview,
        handlers::get_api_session
    ),
    components(schemas(models::SessionView, models::AdminOverview)),
    tags((name = "portal-gate", description = "Session-gated portal"))
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request. Holds no per-request data: the auth provider
/// builds a fresh session client for each request it sees.
#[derive(Clone)]
pub struct AppState {
    /// The external auth collaborator.
    pub auth: AuthProviderState,
    pub guard: Arc<RouteGuard>,
    /// Decides which paths the guard runs on at all.
    pub matcher: Arc<Matcher>,
    pub config: AppConfig,
}

impl AppState {
    /// Wires the guard with the configured lookup-failure policy and the default matcher.
    pub fn new(config: AppConfig, auth: AuthProviderState) -> Self {
        Self {
            auth,
            guard: Arc::new(RouteGuard::with_policy(config.lookup_failure)),
            matcher: Arc::new(Matcher::default()),
            config,
        }
    }
}

impl FromRef<AppState> for AuthProviderState {
    fn from_ref(app_state: &AppState) -> AuthProviderState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// route_guard
///
/// Middleware running the `RouteGuard` on every request the matcher selects,
/// including requests for paths with no route.
///
/// *Mechanism*: binds a session client to the request, lets the guard decide,
/// then either answers with a 307 redirect or forwards the request with the
/// resolved session (if any) stored in its extensions for `AuthSession`.
pub async fn route_guard(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    if !state.matcher.matches(&path) {
        return next.run(request).await;
    }

    let client = state.auth.client_for(request.headers());

    match state.guard.handle(&path, client.as_ref()).await {
        Ok(verdict) => match verdict.outcome {
            Outcome::RedirectTo(target) => Redirect::temporary(&target).into_response(),
            Outcome::PassThrough => {
                if let Some(session) = verdict.session {
                    request.extensions_mut().insert(session);
                }
                next.run(request).await
            }
        },
        Err(e) => e.into_response(),
    }
}

/// create_router
///
/// Assembles the host application's routes, puts the route guard in front of
/// all of them, and wraps everything in the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        // `layer` rather than `route_layer`: unknown paths under /admin still get redirected.
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying the `x-request-id` so every log line of a
/// request, including the guard's verdict, can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
