use std::env;

/// AppConfig
///
/// Holds the gate's entire configuration state. Loaded once at startup and
/// immutable afterwards; pulled into handlers and middleware via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which secrets are mandatory.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Base URL of the Supabase project (e.g. https://abcd.supabase.co).
    pub supabase_url: String,
    // Public anon key, sent as the `apikey` header on remote session lookups.
    pub supabase_anon_key: String,
    // Secret used to verify Supabase-issued access tokens.
    pub jwt_secret: String,
    // Name of the cookie carrying the Supabase session.
    pub session_cookie: String,
    pub verification: SessionVerification,
    pub lookup_failure: LookupFailurePolicy,
}

/// Env
///
/// Runtime context: pretty logs and fallback secrets locally, JSON logs and
/// mandatory secrets in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// How a session cookie is turned into a session.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionVerification {
    /// Decode and verify the access token locally with the project's JWT secret.
    Jwt,
    /// Ask the Supabase auth API (`/auth/v1/user`) whether the token is live.
    Remote,
}

/// What the route guard does when the session lookup itself fails.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LookupFailurePolicy {
    /// Surface the failure as a 500 response.
    Propagate,
    /// Treat the failure as "no session".
    FailClosed,
}

const LOCAL_SUPABASE_URL: &str = "http://localhost:54321";
const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

impl Default for AppConfig {
    /// default
    ///
    /// Provides a safe, non-panicking AppConfig instance primarily used for test setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            supabase_url: LOCAL_SUPABASE_URL.to_string(),
            supabase_anon_key: "local-anon-key".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_cookie: session_cookie_name(LOCAL_SUPABASE_URL),
            verification: SessionVerification::Jwt,
            lookup_failure: LookupFailurePolicy::Propagate,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables and fails fast.
    ///
    /// # Panics
    /// Panics if a variable required for the current runtime environment is
    /// missing (production needs `SUPABASE_URL` and `SUPABASE_JWT_SECRET`, plus
    /// `SUPABASE_ANON_KEY` when sessions are verified remotely), or if one of the
    /// enumerated settings holds an unknown value.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let verification = match env::var("AUTH_SESSION_VERIFICATION").as_deref() {
            Ok("remote") => SessionVerification::Remote,
            Ok("jwt") | Err(_) => SessionVerification::Jwt,
            Ok(other) => panic!("FATAL: unknown AUTH_SESSION_VERIFICATION value '{other}'"),
        };

        let lookup_failure = match env::var("AUTH_LOOKUP_FAILURE").as_deref() {
            Ok("fail-closed") => LookupFailurePolicy::FailClosed,
            Ok("propagate") | Err(_) => LookupFailurePolicy::Propagate,
            Ok(other) => panic!("FATAL: unknown AUTH_LOOKUP_FAILURE value '{other}'"),
        };

        let bind_addr = env::var("APP_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let (supabase_url, jwt_secret, supabase_anon_key) = match env {
            Env::Production => {
                let url =
                    env::var("SUPABASE_URL").expect("FATAL: SUPABASE_URL required in prod");
                let secret = env::var("SUPABASE_JWT_SECRET")
                    .expect("FATAL: SUPABASE_JWT_SECRET must be set in production.");
                let anon_key = match verification {
                    SessionVerification::Remote => env::var("SUPABASE_ANON_KEY").expect(
                        "FATAL: SUPABASE_ANON_KEY required in prod for remote session verification",
                    ),
                    SessionVerification::Jwt => env::var("SUPABASE_ANON_KEY").unwrap_or_default(),
                };
                (url, secret, anon_key)
            }
            // Local Supabase CLI defaults; the developer can still point at a real project.
            Env::Local => (
                env::var("SUPABASE_URL").unwrap_or_else(|_| LOCAL_SUPABASE_URL.to_string()),
                env::var("SUPABASE_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                env::var("SUPABASE_ANON_KEY").unwrap_or_else(|_| "local-anon-key".to_string()),
            ),
        };

        let session_cookie =
            env::var("AUTH_COOKIE_NAME").unwrap_or_else(|_| session_cookie_name(&supabase_url));

        Self {
            env,
            bind_addr,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            jwt_secret,
            session_cookie,
            verification,
            lookup_failure,
        }
    }
}

/// session_cookie_name
///
/// Derives Supabase's default session cookie name, `sb-<project-ref>-auth-token`,
/// where the project ref is the first label of the project URL's host.
pub fn session_cookie_name(supabase_url: &str) -> String {
    let host = supabase_url
        .split("://")
        .last()
        .unwrap_or(supabase_url)
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    let project_ref = host.split('.').next().unwrap_or(host);
    format!("sb-{project_ref}-auth-token")
}
