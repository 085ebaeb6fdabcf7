//! Error types
//!
//! Two families of errors exist in this crate:
//!
//! - [`ConfigError`] - raised while resolving configuration at startup. These are the
//!   only errors that end the process (exit code 1).
//! - [`PortalError`] - raised by the portal collaborators during a monitoring cycle.
//!   The monitor recovers from every one of them; [`PortalError::AuthExpired`] is kept
//!   distinct so the monitor knows to re-authenticate and retry.
//!
//! Command-level code wraps both into `anyhow::Error` with context, the same way the
//! rest of the binary reports failures.

use thiserror::Error;

/// Startup configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a guest link nor a username/password pair could be resolved
    #[error("no credentials configured: set a guest link or both username and password")]
    MissingCredentials,

    /// Credentialed access needs an explicit contract id
    #[error("no contract id configured")]
    MissingContractId,

    /// Guest access could not discover a contract id from the portal
    #[error("contract id could not be resolved from the guest session: {0}")]
    UnresolvedContractId(String),

    /// A value failed validation
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A configuration file could not be read or parsed
    #[error("failed to load configuration file {path}: {reason}")]
    File { path: String, reason: String },
}

/// Portal and session failures
#[derive(Debug, Error)]
pub enum PortalError {
    /// The portal rejected the session (HTTP 403)
    #[error("session expired")]
    AuthExpired,

    /// A login flow did not produce a usable session
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Network failure or timeout
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status outside the handled cases
    #[error("unexpected status {status} while {action}")]
    Status { status: u16, action: &'static str },

    /// The upstream answered with a shape we do not understand
    #[error("unexpected response shape: {0}")]
    Parse(String),

    /// A navigation kept redirecting
    #[error("gave up after {0} redirects")]
    TooManyRedirects(usize),

    /// The refill form token could not be found
    #[error("csrf token not found on {0}")]
    MissingCsrfToken(&'static str),
}

impl PortalError {
    /// Whether the monitor should re-authenticate before retrying
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, PortalError::AuthExpired)
    }
}

/// Result alias for portal operations
pub type PortalResult<T> = std::result::Result<T, PortalError>;
