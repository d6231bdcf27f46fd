use chrono::{DateTime, Utc};

use crate::SessionClaims;

/// Authenticated session for one request.
///
/// Built by the HTTP layer from a verified token and passed explicitly to
/// handlers; there is no process-wide "logged in" flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user_name: String,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionContext {
    pub fn new(user_name: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            user_name: user_name.into(),
            expires_at,
        }
    }

    pub fn from_claims(claims: &SessionClaims) -> Self {
        Self::new(claims.sub.clone(), claims.expires_at())
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}
