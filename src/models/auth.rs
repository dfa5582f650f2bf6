//! Common authentication result and error types
//!
//! Every credential operation returns [`AuthResult`]. Failures keep the
//! provider's raw message for display and add an [`ErrorKind`] so callers can
//! branch on the failure category.

use serde::Serialize;
use std::fmt;

/// Result type shared by register, authenticate and deauthenticate
pub type AuthResult<T> = Result<T, AuthError>;

/// Failure category for an authentication operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected locally before reaching the provider (e.g. empty email)
    InvalidInput,
    EmailExists,
    WeakPassword,
    InvalidEmail,
    /// Unknown account or wrong password
    InvalidCredentials,
    UserDisabled,
    RateLimited,
    OperationNotAllowed,
    /// Transport failure talking to the provider
    Network,
    Timeout,
    Cancelled,
    /// The bookkeeping write failed and the store is configured as required
    Bookkeeping,
    Configuration,
    /// Any provider failure without a more specific mapping
    Provider,
}

impl ErrorKind {
    /// Map an identity provider error code to a kind
    ///
    /// Provider messages look like `WEAK_PASSWORD : Password should be at
    /// least 6 characters`; only the leading code is significant.
    #[must_use]
    pub fn from_provider_code(message: &str) -> Self {
        let code = message
            .split([':', ' '])
            .next()
            .unwrap_or_default()
            .trim();

        match code {
            "EMAIL_EXISTS" => Self::EmailExists,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "INVALID_EMAIL" | "MISSING_EMAIL" => Self::InvalidEmail,
            "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
                Self::InvalidCredentials
            }
            "MISSING_PASSWORD" => Self::InvalidInput,
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::RateLimited,
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => Self::OperationNotAllowed,
            "API_KEY_INVALID" | "INVALID_API_KEY" | "CONFIGURATION_NOT_FOUND" => {
                Self::Configuration
            }
            _ => Self::Provider,
        }
    }

    /// Stable snake-case name used in JSON responses
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::EmailExists => "email_exists",
            Self::WeakPassword => "weak_password",
            Self::InvalidEmail => "invalid_email",
            Self::InvalidCredentials => "invalid_credentials",
            Self::UserDisabled => "user_disabled",
            Self::RateLimited => "rate_limited",
            Self::OperationNotAllowed => "operation_not_allowed",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::Bookkeeping => "bookkeeping",
            Self::Configuration => "configuration",
            Self::Provider => "provider",
        }
    }

    /// HTTP status for JSON clients
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidInput | Self::WeakPassword | Self::InvalidEmail => 400,
            Self::InvalidCredentials => 401,
            Self::UserDisabled | Self::OperationNotAllowed => 403,
            Self::EmailExists => 409,
            Self::RateLimited => 429,
            Self::Cancelled | Self::Configuration => 503,
            Self::Timeout => 504,
            Self::Network | Self::Bookkeeping | Self::Provider => 502,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every credential operation
///
/// `Display` yields the message exactly as the provider reported it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    kind: ErrorKind,
    message: String,
}

impl AuthError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error from a raw provider message, deriving the kind from its code
    #[must_use]
    pub fn from_provider(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ErrorKind::from_provider_code(&message),
            message,
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorKind::Timeout, err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}
