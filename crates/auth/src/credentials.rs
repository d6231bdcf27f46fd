//! Configured login credentials.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("invalid username or password")]
    InvalidCredentials,
}

/// The single operator account allowed to sign in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check a login attempt. Surrounding whitespace is ignored on both fields.
    ///
    /// Returns the canonical user name on success.
    pub fn verify(&self, username: &str, password: &str) -> Result<&str, LoginError> {
        let user_ok = constant_time_eq(username.trim().as_bytes(), self.username.as_bytes());
        let pass_ok = constant_time_eq(password.trim().as_bytes(), self.password.as_bytes());
        if user_ok & pass_ok {
            Ok(&self.username)
        } else {
            Err(LoginError::InvalidCredentials)
        }
    }
}

// Keep the password out of logs.
impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_trimmed_credentials() {
        let creds = Credentials::new("admin", "1234");
        assert_eq!(creds.verify(" admin ", "1234 "), Ok("admin"));
    }

    #[test]
    fn rejects_wrong_user_or_password() {
        let creds = Credentials::new("admin", "1234");
        assert_eq!(creds.verify("admin", "12345"), Err(LoginError::InvalidCredentials));
        assert_eq!(creds.verify("root", "1234"), Err(LoginError::InvalidCredentials));
        assert_eq!(creds.verify("", ""), Err(LoginError::InvalidCredentials));
    }

    #[test]
    fn debug_output_hides_password() {
        let creds = Credentials::new("admin", "s3cret");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("s3cret"));
    }
}
