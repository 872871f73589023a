//! # Bolt Protocol Implementation
//!
//! Low-level client implementation of the Bolt protocol for
//! communication with Bolt-compatible graph databases.
//!
//! ## Submodules
//!
//! - [`packstream`] - Binary value serialization
//! - [`message`] - Request/response message types
//! - [`handshake`] - Version negotiation
//! - [`codec`] - Chunked framing for async I/O
//! - [`error`] - Protocol error types
//!
//! Most users should use the high-level [`crate::driver`] module instead
//! of this layer directly.

pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packstream;

pub use codec::{BoltClientCodec, ChunkedCodec};
pub use error::{BoltError, BoltErrorCode, BoltResult, HandshakeError};
pub use handshake::{BoltVersion, BOLT_MAGIC};
pub use message::{
    AccessMode, AuthToken, BeginMessage, BoltRequest, BoltResponse, DiscardMessage,
    FailureMessage, HelloMessage, PullMessage, RecordMessage, RunMessage, SuccessMessage,
};
pub use packstream::{
    PackStreamDecoder, PackStreamEncoder, PackStreamError, PackStreamStructure, PackStreamType,
    PackStreamValue,
};
