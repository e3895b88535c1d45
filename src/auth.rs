use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{AppConfig, SessionVerification};

/// Audience Supabase stamps on tokens issued to signed-in users.
const AUTHENTICATED_AUDIENCE: &str = "authenticated";

/// Claims
///
/// The payload of a Supabase access token (a HS256 JWT signed with the
/// project's JWT secret).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user in `auth.users`.
    pub sub: Uuid,
    /// Expiration Time (exp): seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    AUTHENTICATED_AUDIENCE.to_string()
}

/// Session
///
/// Proof of authentication handed back by the auth provider. The route guard
/// only cares whether one exists; handlers behind the guard may read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: String,
    /// Known when the provider or the token states it.
    pub expires_at: Option<DateTime<Utc>>,
    /// Raw bearer token. Never serialized to clients.
    pub access_token: String,
}

impl Session {
    fn from_claims(claims: Claims, access_token: &str) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            expires_at: i64::try_from(claims.exp)
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            access_token: access_token.to_string(),
        }
    }
}

/// SessionError
///
/// Failures of the session lookup itself, as opposed to "there is no session".
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("auth provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("auth provider responded with status {0}")]
    UnexpectedStatus(u16),
    #[error("auth provider returned an unreadable response: {0}")]
    InvalidResponse(String),
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
}

/// SessionClient
///
/// A session lookup bound to exactly one request.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Returns the session carried by the bound request, `None` when the
    /// request is anonymous.
    async fn get_session(&self) -> Result<Option<Session>, SessionError>;
}

/// AuthProvider
///
/// The external auth collaborator. Builds a fresh `SessionClient` for every
/// request so no session state is carried from one request to the next.
pub trait AuthProvider: Send + Sync {
    fn client_for(&self, headers: &HeaderMap) -> Box<dyn SessionClient>;
}

/// AuthProviderState
///
/// The concrete type used to share the auth provider across the application state.
pub type AuthProviderState = Arc<dyn AuthProvider>;

// --- Supabase Adapter ---

/// SupabaseAuthProvider
///
/// Reads the Supabase session cookie and resolves it either by verifying the
/// access token locally or by asking the project's auth API.
///
/// Only the immutable config and reqwest's connection pool (which is built
/// to be shared across tasks) outlive a request.
#[derive(Clone)]
pub struct SupabaseAuthProvider {
    config: Arc<AppConfig>,
    http: reqwest::Client,
}

impl SupabaseAuthProvider {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}

impl AuthProvider for SupabaseAuthProvider {
    fn client_for(&self, headers: &HeaderMap) -> Box<dyn SessionClient> {
        let jar = CookieJar::from_headers(headers);
        let stored = read_session_cookie(&jar, &self.config.session_cookie)
            .and_then(|raw| decode_stored_session(&raw));

        Box::new(SupabaseSessionClient {
            stored,
            config: Arc::clone(&self.config),
            http: self.http.clone(),
        })
    }
}

/// SupabaseSessionClient
///
/// Per-request binding produced by `SupabaseAuthProvider::client_for`.
pub struct SupabaseSessionClient {
    stored: Option<StoredSession>,
    config: Arc<AppConfig>,
    http: reqwest::Client,
}

#[async_trait]
impl SessionClient for SupabaseSessionClient {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        let Some(stored) = &self.stored else {
            return Ok(None);
        };

        match self.config.verification {
            SessionVerification::Jwt => Ok(verify_access_token(
                &stored.access_token,
                &self.config.jwt_secret,
            )),
            SessionVerification::Remote => self.fetch_user(stored).await,
        }
    }
}

/// User object returned by `GET /auth/v1/user`.
#[derive(Deserialize)]
struct GoTrueUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default = "default_role")]
    role: String,
}

impl SupabaseSessionClient {
    async fn fetch_user(&self, stored: &StoredSession) -> Result<Option<Session>, SessionError> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.config.supabase_url))
            .header("apikey", &self.config.supabase_anon_key)
            .bearer_auth(&stored.access_token)
            .send()
            .await?;

        match response.status() {
            reqwest::StatusCode::OK => {
                let user: GoTrueUser = response
                    .json()
                    .await
                    .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;

                Ok(Some(Session {
                    user_id: user.id,
                    email: user.email,
                    role: user.role,
                    expires_at: stored
                        .expires_at
                        .and_then(|secs| DateTime::from_timestamp(secs, 0)),
                    access_token: stored.access_token.clone(),
                }))
            }
            // Revoked or expired token: the provider answered, the answer is "no session".
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                tracing::debug!("auth provider rejected session token");
                Ok(None)
            }
            other => Err(SessionError::UnexpectedStatus(other.as_u16())),
        }
    }
}

/// verify_access_token
///
/// Decodes a Supabase access token with the project's JWT secret. Any
/// validation failure (bad signature, wrong audience, expiry) means "no session".
pub fn verify_access_token(token: &str, jwt_secret: &str) -> Option<Session> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.set_audience(&[AUTHENTICATED_AUDIENCE]);

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(Session::from_claims(data.claims, token)),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                _ => tracing::debug!(error = %e, "session token rejected"),
            }
            None
        }
    }
}

// --- Session Cookie Decoding ---

/// The parts of a stored Supabase session the gate needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub access_token: String,
    pub expires_at: Option<i64>,
}

/// The two shapes Supabase clients have written into the session cookie.
#[derive(Deserialize)]
#[serde(untagged)]
enum CookiePayload {
    Object {
        access_token: String,
        #[serde(default)]
        expires_at: Option<i64>,
    },
    // [access_token, refresh_token, provider_token, provider_refresh_token, factors]
    Legacy(Vec<serde_json::Value>),
}

/// read_session_cookie
///
/// Returns the raw cookie value, reassembling `<name>.0`, `<name>.1`, ...
/// chunks when the value was too large for a single cookie.
pub fn read_session_cookie(jar: &CookieJar, name: &str) -> Option<String> {
    if let Some(cookie) = jar.get(name) {
        return Some(cookie.value().to_string());
    }

    let chunks: Vec<&str> = (0..)
        .map_while(|i| jar.get(&format!("{name}.{i}")).map(|c| c.value()))
        .collect();

    if chunks.is_empty() {
        None
    } else {
        Some(chunks.concat())
    }
}

/// decode_stored_session
///
/// Parses a session cookie value, with or without the `base64-` prefix.
/// Malformed values yield `None`.
pub fn decode_stored_session(raw: &str) -> Option<StoredSession> {
    let json = match raw.strip_prefix("base64-") {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD
                .decode(encoded.trim_end_matches('='))
                .ok()?;
            String::from_utf8(bytes).ok()?
        }
        None => raw.to_string(),
    };

    match serde_json::from_str::<CookiePayload>(&json) {
        Ok(CookiePayload::Object {
            access_token,
            expires_at,
        }) => Some(StoredSession {
            access_token,
            expires_at,
        }),
        Ok(CookiePayload::Legacy(values)) => values
            .first()
            .and_then(|v| v.as_str())
            .map(|token| StoredSession {
                access_token: token.to_string(),
                expires_at: None,
            }),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring malformed session cookie");
            None
        }
    }
}

// --- Extractor ---

/// AuthSession Extractor
///
/// Hands the session the route guard resolved to a handler. The guard stores
/// it in the request extensions on pass-through.
///
/// Rejection: `StatusCode::UNAUTHORIZED` when the request reached the handler
/// without a session (unprotected route, or a route excluded from the guard).
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(AuthSession)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

// --- Mock Implementation (For Tests) ---

/// MockAuthProvider
///
/// In-memory provider for tests: always anonymous, always signed in as a
/// fixed session, or always failing. Counts lookups so tests can assert the
/// guard never consulted it.
#[derive(Clone)]
pub struct MockAuthProvider {
    session: Option<Session>,
    should_fail: bool,
    lookups: Arc<AtomicUsize>,
}

impl MockAuthProvider {
    pub fn anonymous() -> Self {
        Self {
            session: None,
            should_fail: false,
            lookups: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn signed_in(session: Session) -> Self {
        Self {
            session: Some(session),
            ..Self::anonymous()
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::anonymous()
        }
    }

    /// Number of session lookups performed so far, across all clients.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl AuthProvider for MockAuthProvider {
    fn client_for(&self, _headers: &HeaderMap) -> Box<dyn SessionClient> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl SessionClient for MockAuthProvider {
    async fn get_session(&self) -> Result<Option<Session>, SessionError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(SessionError::Unavailable(
                "Mock Auth Error: Simulation requested".to_string(),
            ));
        }
        Ok(self.session.clone())
    }
}
