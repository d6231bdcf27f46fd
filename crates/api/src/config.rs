//! Process configuration, read from `ALMOX_*` environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ALMOX_BIND_ADDR` | `0.0.0.0:8080` |
//! | `ALMOX_DATABASE_URL` | `sqlite://almox.db?mode=rwc` |
//! | `ALMOX_SESSION_SECRET` | insecure dev secret (warned) |
//! | `ALMOX_SESSION_TTL_MINUTES` | `480` |
//! | `ALMOX_ADMIN_USER` | `admin` (warned) |
//! | `ALMOX_ADMIN_PASSWORD` | `1234` (warned) |
//! | `ALMOX_INVOICE_POLICY` | `lenient` (`lenient` \| `strict`) |
//! | `ALMOX_LOG_FORMAT` | `json` (`json` \| `pretty`) |
//!
//! Present but unparsable values are startup errors, never silently defaulted.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use almox_assets::InvoiceAttachmentPolicy;
use almox_observability::LogFormat;

const DEV_SESSION_SECRET: &str = "almox-dev-secret";
const DEV_ADMIN_USER: &str = "admin";
const DEV_ADMIN_PASSWORD: &str = "1234";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid value for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub reason: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub admin_user: String,
    pub admin_password: String,
    pub invoice_policy: InvoiceAttachmentPolicy,
    pub log_format: LogFormat,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url)
            .field("session_ttl", &self.session_ttl)
            .field("admin_user", &self.admin_user)
            .field("invoice_policy", &self.invoice_policy)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("ALMOX_BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e| invalid("ALMOX_BIND_ADDR", e))?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let session_ttl = match get("ALMOX_SESSION_TTL_MINUTES") {
            Some(raw) => {
                let minutes: i64 = raw
                    .parse()
                    .map_err(|e| invalid("ALMOX_SESSION_TTL_MINUTES", e))?;
                if minutes <= 0 {
                    return Err(invalid("ALMOX_SESSION_TTL_MINUTES", "must be positive"));
                }
                Duration::minutes(minutes)
            }
            None => Duration::minutes(480),
        };

        let invoice_policy = match get("ALMOX_INVOICE_POLICY") {
            Some(raw) => raw.parse().map_err(|e| invalid("ALMOX_INVOICE_POLICY", e))?,
            None => InvoiceAttachmentPolicy::default(),
        };

        let log_format = match get("ALMOX_LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|e| invalid("ALMOX_LOG_FORMAT", e))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            database_url: get("ALMOX_DATABASE_URL")
                .unwrap_or_else(|| "sqlite://almox.db?mode=rwc".to_string()),
            session_secret: get("ALMOX_SESSION_SECRET")
                .unwrap_or_else(|| DEV_SESSION_SECRET.to_string()),
            session_ttl,
            admin_user: get("ALMOX_ADMIN_USER").unwrap_or_else(|| DEV_ADMIN_USER.to_string()),
            admin_password: get("ALMOX_ADMIN_PASSWORD")
                .unwrap_or_else(|| DEV_ADMIN_PASSWORD.to_string()),
            invoice_policy,
            log_format,
        })
    }

    /// Names of the variables still running on insecure development defaults.
    pub fn insecure_defaults(&self) -> Vec<&'static str> {
        let mut vars = Vec::new();
        if self.session_secret == DEV_SESSION_SECRET {
            vars.push("ALMOX_SESSION_SECRET");
        }
        if self.admin_user == DEV_ADMIN_USER {
            vars.push("ALMOX_ADMIN_USER");
        }
        if self.admin_password == DEV_ADMIN_PASSWORD {
            vars.push("ALMOX_ADMIN_PASSWORD");
        }
        vars
    }
}

fn invalid(var: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError {
        var,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_apply_and_are_flagged() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.session_ttl, Duration::minutes(480));
        assert_eq!(cfg.invoice_policy, InvoiceAttachmentPolicy::Lenient);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(
            cfg.insecure_defaults(),
            ["ALMOX_SESSION_SECRET", "ALMOX_ADMIN_USER", "ALMOX_ADMIN_PASSWORD"]
        );
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = config(&[
            ("ALMOX_BIND_ADDR", "127.0.0.1:9000"),
            ("ALMOX_SESSION_SECRET", "s3cret"),
            ("ALMOX_SESSION_TTL_MINUTES", "15"),
            ("ALMOX_ADMIN_USER", "tesouraria"),
            ("ALMOX_ADMIN_PASSWORD", "x"),
            ("ALMOX_INVOICE_POLICY", "strict"),
            ("ALMOX_LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.session_ttl, Duration::minutes(15));
        assert_eq!(cfg.invoice_policy, InvoiceAttachmentPolicy::Strict);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(cfg.insecure_defaults().is_empty());
    }

    #[test]
    fn malformed_values_are_errors() {
        for (var, value) in [
            ("ALMOX_BIND_ADDR", "not-an-addr"),
            ("ALMOX_SESSION_TTL_MINUTES", "0"),
            ("ALMOX_SESSION_TTL_MINUTES", "ten"),
            ("ALMOX_INVOICE_POLICY", "sometimes"),
            ("ALMOX_LOG_FORMAT", "xml"),
        ] {
            let err = config(&[(var, value)]).unwrap_err();
            assert_eq!(err.var, var);
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = config(&[("ALMOX_SESSION_SECRET", "topsecret"), ("ALMOX_ADMIN_PASSWORD", "hunter2")])
            .unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("hunter2"));
    }
}
