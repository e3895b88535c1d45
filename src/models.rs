use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Session;

/// SessionView
///
/// The client-facing projection of a session. The access token stays on the server.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct SessionView {
    pub user_id: Uuid,
    pub email: Option<String>,
    // Supabase role claim, usually 'authenticated'.
    pub role: String,
    #[ts(type = "string | null")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id,
            email: session.email.clone(),
            role: session.role.clone(),
            expires_at: session.expires_at,
        }
    }
}

/// AdminOverview
///
/// Body of `GET /admin`: who is looking, and which prefixes the gate protects.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminOverview {
    pub viewer: SessionView,
    pub protected_prefixes: Vec<String>,
}
