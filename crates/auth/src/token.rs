//! Signed session tokens (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or tampered token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// A freshly issued token and when it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issue/verify boundary used by the HTTP layer.
pub trait SessionTokens: Send + Sync {
    fn issue(&self, user_name: &str, now: DateTime<Utc>) -> Result<IssuedToken, TokenError>;

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// HMAC-SHA256 session tokens with a fixed lifetime.
pub struct Hs256SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl Hs256SessionTokens {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl core::fmt::Debug for Hs256SessionTokens {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256SessionTokens")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SessionTokens for Hs256SessionTokens {
    fn issue(&self, user_name: &str, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let claims = SessionClaims::new(user_name, now, self.ttl);
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at: now + self.ttl,
        })
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        // Time checks are done by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Hs256SessionTokens {
        Hs256SessionTokens::new(b"test-secret", Duration::minutes(30))
    }

    #[test]
    fn issued_token_verifies() {
        let now = Utc::now();
        let issued = tokens().issue("admin", now).unwrap();
        let claims = tokens().verify(&issued.token, now).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.exp, issued.expires_at.timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let issued = tokens().issue("admin", now).unwrap();
        assert_eq!(
            tokens().verify(&issued.token, now + Duration::minutes(31)),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let now = Utc::now();
        let other = Hs256SessionTokens::new(b"other-secret", Duration::minutes(30));
        let issued = other.issue("admin", now).unwrap();
        assert!(matches!(tokens().verify(&issued.token, now), Err(TokenError::Invalid(_))));
        assert!(matches!(tokens().verify("not-a-jwt", now), Err(TokenError::Invalid(_))));
    }
}
