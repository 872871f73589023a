//! Driver error types.

use std::io;

use thiserror::Error;

use crate::bolt::error::BoltError;
use crate::bolt::message::FailureMessage;
use crate::translator::TranslationError;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors surfaced by the driver.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Protocol violation: malformed frame, wrong structure field count,
    /// unknown or disallowed signature, message in the wrong state
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Transport broken or connection defunct
    #[error("connection closed")]
    ConnectionClosed,

    /// Authentication rejected
    #[error("authentication error: {0}")]
    Authentication(String),

    /// FAILURE returned by the server
    #[error("server error: {code} - {message}")]
    Server {
        /// Server error code ("Neo.<class>.<category>.<title>")
        code: String,
        /// Human-readable message
        message: String,
    },

    /// Client-side query deadline exceeded
    #[error("timeout: {0}")]
    Timeout(String),

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Conversion or feature not supported
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// SQL to Cypher translation failed
    #[error("translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Typed getter could not coerce the value
    #[error("type conversion error: {0}")]
    TypeConversion(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DriverError {
    /// Protocol violation helper.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Authentication error helper.
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Server error helper.
    pub fn server(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Server {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Timeout error helper.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Unsupported-feature error helper.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Coercion error helper.
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// Configuration error helper.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether retrying the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionClosed | Self::Timeout(_) => true,
            Self::Server { code, .. } => is_retryable_code(code),
            _ => false,
        }
    }

    /// Whether this error was caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Authentication(_)
            | Self::Configuration(_)
            | Self::TypeConversion(_)
            | Self::Translation(_)
            | Self::Unsupported(_) => true,
            Self::Server { code, .. } => code.starts_with("Neo.ClientError"),
            _ => false,
        }
    }

    /// Whether a server failure is transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Server { code, .. } if code.starts_with("Neo.TransientError"))
    }
}

/// Server codes worth retrying.
fn is_retryable_code(code: &str) -> bool {
    code.starts_with("Neo.TransientError")
        || code == "Neo.ClientError.Cluster.NotALeader"
        || code == "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase"
}

impl From<BoltError> for DriverError {
    fn from(err: BoltError) -> Self {
        match err {
            BoltError::Io(_) | BoltError::Connection(_) | BoltError::ConnectionClosed => {
                DriverError::ConnectionClosed
            }
            BoltError::Authentication(msg) => DriverError::Authentication(msg),
            BoltError::Handshake(e) => DriverError::Protocol(e.to_string()),
            BoltError::PackStream(e) => DriverError::Protocol(e.to_string()),
            BoltError::Protocol(msg) => DriverError::Protocol(msg),
            BoltError::MessageTooLarge { size, max } => {
                DriverError::Protocol(format!("message too large: {size} bytes (max {max})"))
            }
        }
    }
}

impl From<FailureMessage> for DriverError {
    fn from(failure: FailureMessage) -> Self {
        if failure.code.contains("Security") || failure.code.contains("Authentication") {
            DriverError::Authentication(failure.message)
        } else {
            DriverError::Server {
                code: failure.code,
                message: failure.message,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        let err = DriverError::protocol("bad frame");
        assert_eq!(err.to_string(), "protocol violation: bad frame");

        let err = DriverError::server("Neo.ClientError.Statement.SyntaxError", "bad query");
        assert_eq!(
            err.to_string(),
            "server error: Neo.ClientError.Statement.SyntaxError - bad query"
        );
    }

    #[test]
    fn retryability() {
        assert!(DriverError::ConnectionClosed.is_retryable());
        assert!(DriverError::timeout("deadline").is_retryable());
        assert!(
            DriverError::server("Neo.TransientError.General.DatabaseUnavailable", "busy")
                .is_retryable()
        );
        assert!(!DriverError::server("Neo.ClientError.Statement.SyntaxError", "bad")
            .is_retryable());
        assert!(!DriverError::authentication("nope").is_retryable());
    }

    #[test]
    fn classification() {
        assert!(DriverError::authentication("nope").is_client_error());
        assert!(
            DriverError::server("Neo.ClientError.Statement.SyntaxError", "bad").is_client_error()
        );
        assert!(!DriverError::server("Neo.DatabaseError.General.UnknownError", "boom")
            .is_client_error());
        assert!(DriverError::server("Neo.TransientError.Transaction.DeadlockDetected", "dl")
            .is_transient());
    }

    #[test]
    fn failure_message_conversion() {
        let err: DriverError =
            FailureMessage::new("Neo.ClientError.Security.Unauthorized", "denied").into();
        assert!(matches!(err, DriverError::Authentication(_)));

        let err: DriverError =
            FailureMessage::new("Neo.TransientError.General.DatabaseUnavailable", "busy").into();
        assert!(matches!(err, DriverError::Server { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn bolt_error_conversion() {
        let err: DriverError = BoltError::ConnectionClosed.into();
        assert!(matches!(err, DriverError::ConnectionClosed));

        let err: DriverError = BoltError::Protocol("oops".into()).into();
        assert!(matches!(err, DriverError::Protocol(_)));
    }
}
