//! `almox-auth`: authentication boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it checks a
//! configured credential pair, issues and verifies signed session tokens, and
//! defines the request-scoped [`SessionContext`] handed to handlers.

pub mod claims;
pub mod credentials;
pub mod session;
pub mod token;

pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use credentials::{Credentials, LoginError};
pub use session::SessionContext;
pub use token::{Hs256SessionTokens, IssuedToken, SessionTokens, TokenError};
