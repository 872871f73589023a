//! Bolt protocol error types.

use std::fmt;
use std::io;

use super::packstream::PackStreamError;

/// Result type for Bolt operations.
pub type BoltResult<T> = Result<T, BoltError>;

/// Errors raised by the wire-protocol layer.
#[derive(Debug)]
pub enum BoltError {
    /// I/O error on the transport
    Io(io::Error),

    /// Handshake failed
    Handshake(HandshakeError),

    /// PackStream (de)serialization error
    PackStream(PackStreamError),

    /// Protocol violation (bad frame, unexpected message, bad state)
    Protocol(String),

    /// Authentication rejected
    Authentication(String),

    /// Transport-level connection problem
    Connection(String),

    /// Message exceeded the configured size limit
    MessageTooLarge {
        /// Observed message size so far
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Connection closed by the peer or marked defunct
    ConnectionClosed,
}

impl fmt::Display for BoltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoltError::Io(e) => write!(f, "I/O error: {e}"),
            BoltError::Handshake(e) => write!(f, "handshake error: {e}"),
            BoltError::PackStream(e) => write!(f, "PackStream error: {e}"),
            BoltError::Protocol(msg) => write!(f, "protocol error: {msg}"),
            BoltError::Authentication(msg) => write!(f, "authentication error: {msg}"),
            BoltError::Connection(msg) => write!(f, "connection error: {msg}"),
            BoltError::MessageTooLarge { size, max } => {
                write!(f, "message too large: {size} bytes (max: {max})")
            }
            BoltError::ConnectionClosed => write!(f, "connection closed"),
        }
    }
}

impl std::error::Error for BoltError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoltError::Io(e) => Some(e),
            BoltError::Handshake(e) => Some(e),
            BoltError::PackStream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BoltError {
    fn from(err: io::Error) -> Self {
        BoltError::Io(err)
    }
}

impl From<HandshakeError> for BoltError {
    fn from(err: HandshakeError) -> Self {
        BoltError::Handshake(err)
    }
}

impl From<PackStreamError> for BoltError {
    fn from(err: PackStreamError) -> Self {
        BoltError::PackStream(err)
    }
}

/// Handshake-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The server rejected every proposed version
    NoCompatibleVersion,

    /// Response was malformed
    InvalidData(String),

    /// Connection closed during the handshake
    ConnectionClosed,
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::NoCompatibleVersion => {
                write!(f, "no compatible protocol version found")
            }
            HandshakeError::InvalidData(msg) => write!(f, "invalid handshake data: {msg}"),
            HandshakeError::ConnectionClosed => {
                write!(f, "connection closed during handshake")
            }
        }
    }
}

impl std::error::Error for HandshakeError {}

/// Well-known server error codes.
pub struct BoltErrorCode;

impl BoltErrorCode {
    // Client errors
    pub const AUTHENTICATION_FAILED: &'static str =
        "Neo.ClientError.Security.AuthenticationFailed";
    pub const UNAUTHORIZED: &'static str = "Neo.ClientError.Security.Unauthorized";
    pub const SYNTAX_ERROR: &'static str = "Neo.ClientError.Statement.SyntaxError";
    pub const SEMANTIC_ERROR: &'static str = "Neo.ClientError.Statement.SemanticError";
    pub const INVALID_REQUEST: &'static str = "Neo.ClientError.Request.Invalid";

    // Database errors
    pub const GENERAL_ERROR: &'static str = "Neo.DatabaseError.General.UnknownError";
    pub const EXECUTION_FAILED: &'static str = "Neo.DatabaseError.Statement.ExecutionFailed";

    // Transient errors (retry may succeed)
    pub const TRANSACTION_TIMEOUT: &'static str =
        "Neo.TransientError.Transaction.TransactionTimedOut";
    pub const DEADLOCK_DETECTED: &'static str =
        "Neo.TransientError.Transaction.DeadlockDetected";
    pub const DATABASE_UNAVAILABLE: &'static str =
        "Neo.TransientError.General.DatabaseUnavailable";
}
