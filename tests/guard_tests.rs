use portal_gate::{
    MockAuthProvider, Outcome, RouteGuard,
    auth::{AuthProvider, Session},
    config::LookupFailurePolicy,
    guard::GuardError,
    matcher::Matcher,
};
use axum::http::HeaderMap;
use uuid::Uuid;

// --- Helper Functions ---

fn test_session() -> Session {
    Session {
        user_id: Uuid::from_u128(7),
        email: Some("member@example.com".to_string()),
        role: "authenticated".to_string(),
        expires_at: None,
        access_token: "token".to_string(),
    }
}

fn redirect(path: &str) -> Outcome {
    Outcome::RedirectTo(path.to_string())
}

async fn outcome_for(guard: &RouteGuard, provider: &MockAuthProvider, path: &str) -> Outcome {
    let client = provider.client_for(&HeaderMap::new());
    guard
        .handle(path, client.as_ref())
        .await
        .expect("lookup should succeed")
        .outcome
}

// --- Classification ---

#[test]
fn test_protected_prefixes() {
    let guard = RouteGuard::default();

    assert!(guard.is_protected("/admin"));
    assert!(guard.is_protected("/admin/users/42"));
    assert!(guard.is_protected("/account"));
    assert!(guard.is_protected("/account/settings"));
    // Plain prefix test, not segment matching.
    assert!(guard.is_protected("/administrator"));

    assert!(!guard.is_protected("/"));
    assert!(!guard.is_protected("/login"));
    assert!(!guard.is_protected("/pricing"));
    assert!(!guard.is_protected("/my/admin"));
}

// --- Decision Table ---

#[test]
fn test_decide_table() {
    let guard = RouteGuard::default();

    assert_eq!(guard.decide("/admin", false), redirect("/login"));
    assert_eq!(guard.decide("/account/billing", false), redirect("/login"));
    assert_eq!(guard.decide("/admin", true), Outcome::PassThrough);
    assert_eq!(guard.decide("/account/billing", true), Outcome::PassThrough);

    assert_eq!(guard.decide("/login", true), redirect("/"));
    assert_eq!(guard.decide("/login/magic-link", true), redirect("/"));
    assert_eq!(guard.decide("/login", false), Outcome::PassThrough);

    assert_eq!(guard.decide("/pricing", false), Outcome::PassThrough);
    assert_eq!(guard.decide("/pricing", true), Outcome::PassThrough);
    assert_eq!(guard.decide("/", true), Outcome::PassThrough);
}

#[tokio::test]
async fn test_protected_paths_without_session_redirect_to_login() {
    let guard = RouteGuard::default();
    let provider = MockAuthProvider::anonymous();

    for path in ["/admin", "/admin/reports", "/account", "/account/profile"] {
        assert_eq!(outcome_for(&guard, &provider, path).await, redirect("/login"), "{path}");
    }
}

#[tokio::test]
async fn test_protected_paths_with_session_pass_through() {
    let guard = RouteGuard::default();
    let provider = MockAuthProvider::signed_in(test_session());

    for path in ["/admin", "/admin/reports", "/account", "/account/profile"] {
        assert_eq!(outcome_for(&guard, &provider, path).await, Outcome::PassThrough, "{path}");
    }
}

#[tokio::test]
async fn test_login_redirects_signed_in_users_home() {
    let guard = RouteGuard::default();

    let signed_in = MockAuthProvider::signed_in(test_session());
    assert_eq!(outcome_for(&guard, &signed_in, "/login").await, redirect("/"));

    let anonymous = MockAuthProvider::anonymous();
    assert_eq!(outcome_for(&guard, &anonymous, "/login").await, Outcome::PassThrough);
}

#[tokio::test]
async fn test_unprotected_paths_pass_through_regardless_of_session() {
    let guard = RouteGuard::default();

    for provider in [
        MockAuthProvider::anonymous(),
        MockAuthProvider::signed_in(test_session()),
    ] {
        assert_eq!(outcome_for(&guard, &provider, "/pricing").await, Outcome::PassThrough);
        assert_eq!(outcome_for(&guard, &provider, "/").await, Outcome::PassThrough);
    }
}

#[tokio::test]
async fn test_verdict_carries_session() {
    let guard = RouteGuard::default();
    let provider = MockAuthProvider::signed_in(test_session());
    let client = provider.client_for(&HeaderMap::new());

    let verdict = guard.handle("/account", client.as_ref()).await.unwrap();

    assert_eq!(verdict.outcome, Outcome::PassThrough);
    assert_eq!(verdict.session, Some(test_session()));
    assert_eq!(provider.lookups(), 1);
}

// --- Lookup Failure Policy ---

#[tokio::test]
async fn test_lookup_failure_propagates_by_default() {
    let guard = RouteGuard::default();
    assert_eq!(guard.lookup_failure(), LookupFailurePolicy::Propagate);

    let provider = MockAuthProvider::failing();
    let client = provider.client_for(&HeaderMap::new());

    let result = guard.handle("/account", client.as_ref()).await;

    assert!(matches!(result, Err(GuardError::SessionLookup(_))));
}

#[tokio::test]
async fn test_lookup_failure_fail_closed_treats_request_as_anonymous() {
    let guard = RouteGuard::with_policy(LookupFailurePolicy::FailClosed);
    let provider = MockAuthProvider::failing();

    assert_eq!(outcome_for(&guard, &provider, "/admin").await, redirect("/login"));
    assert_eq!(outcome_for(&guard, &provider, "/login").await, Outcome::PassThrough);
    assert_eq!(outcome_for(&guard, &provider, "/pricing").await, Outcome::PassThrough);
}

// --- Matcher ---

#[test]
fn test_matcher_excludes_api_and_assets() {
    let matcher = Matcher::default();

    assert!(!matcher.matches("/api/foo"));
    assert!(!matcher.matches("/api"));
    assert!(!matcher.matches("/_next/static/x.js"));
    assert!(!matcher.matches("/_next/image"));
    assert!(!matcher.matches("/favicon.ico"));
    // Prefix semantics, same as the lookahead pattern it replaces.
    assert!(!matcher.matches("/apiary"));

    assert!(matcher.matches("/"));
    assert!(matcher.matches("/admin"));
    assert!(matcher.matches("/login"));
    assert!(matcher.matches("/pricing"));
    assert!(matcher.matches("/_next/data/build.json"));
    assert!(matcher.matches("/docs/api"));
}

#[test]
fn test_matcher_custom_exclusions() {
    let matcher = Matcher::new(["assets", "robots.txt"]);

    assert!(!matcher.matches("/assets/app.css"));
    assert!(!matcher.matches("/robots.txt"));
    assert!(matcher.matches("/api/foo"));
}
