use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    auth::{Session, SessionClient, SessionError},
    config::LookupFailurePolicy,
};

/// Path prefixes that require a session.
pub const PROTECTED_PREFIXES: [&str; 2] = ["/admin", "/account"];

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

/// Outcome
///
/// What the host should do with a request after the guard has looked at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the request to the application unchanged.
    PassThrough,
    /// Answer with a redirect to the given path.
    RedirectTo(String),
}

/// Verdict
///
/// The outcome together with the session that produced it.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub outcome: Outcome,
    pub session: Option<Session>,
}

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("session lookup failed: {0}")]
    SessionLookup(#[from] SessionError),
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "route guard aborted request");
        (StatusCode::INTERNAL_SERVER_ERROR, "session lookup failed").into_response()
    }
}

/// RouteGuard
///
/// Sends anonymous users on protected paths to the login page and signed-in
/// users on the login page back home. Everything else passes through.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    protected_prefixes: Vec<String>,
    login_path: String,
    home_path: String,
    lookup_failure: LookupFailurePolicy,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self {
            protected_prefixes: PROTECTED_PREFIXES.iter().map(|p| p.to_string()).collect(),
            login_path: LOGIN_PATH.to_string(),
            home_path: HOME_PATH.to_string(),
            lookup_failure: LookupFailurePolicy::Propagate,
        }
    }
}

impl RouteGuard {
    pub fn with_policy(lookup_failure: LookupFailurePolicy) -> Self {
        Self {
            lookup_failure,
            ..Self::default()
        }
    }

    pub fn lookup_failure(&self) -> LookupFailurePolicy {
        self.lookup_failure
    }

    /// is_protected
    ///
    /// Plain string-prefix test against the protected prefixes. Note that
    /// `/administrator` counts as protected, same as `/admin/users`.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// decide
    ///
    /// The decision table; first match wins:
    ///
    /// | protected | starts with login | session | outcome          |
    /// |-----------|-------------------|---------|------------------|
    /// | yes       | -                 | no      | redirect to login|
    /// | no        | yes               | yes     | redirect home    |
    /// | otherwise |                   |         | pass through     |
    pub fn decide(&self, path: &str, session_present: bool) -> Outcome {
        if self.is_protected(path) {
            if !session_present {
                return Outcome::RedirectTo(self.login_path.clone());
            }
        } else if path.starts_with(self.login_path.as_str()) && session_present {
            return Outcome::RedirectTo(self.home_path.clone());
        }

        Outcome::PassThrough
    }

    /// handle
    ///
    /// Looks the session up through the request's client (the only await
    /// point) and applies the decision table. A failed lookup either becomes
    /// a `GuardError` or counts as "no session", depending on the policy.
    pub async fn handle(
        &self,
        path: &str,
        client: &dyn SessionClient,
    ) -> Result<Verdict, GuardError> {
        let session = match client.get_session().await {
            Ok(session) => session,
            Err(e) => match self.lookup_failure {
                LookupFailurePolicy::Propagate => return Err(e.into()),
                LookupFailurePolicy::FailClosed => {
                    tracing::warn!(error = %e, path, "session lookup failed, treating request as anonymous");
                    None
                }
            },
        };

        let outcome = self.decide(path, session.is_some());
        tracing::debug!(path, session = session.is_some(), ?outcome, "route guard verdict");

        Ok(Verdict { outcome, session })
    }
}
