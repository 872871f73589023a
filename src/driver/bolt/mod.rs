//! Client-side Bolt connection machinery.
//!
//! [`connection`] owns the transport: handshake, chunked framing, raw
//! send/receive. [`client`] layers the per-connection state machine on
//! top: authentication, the request/response protocol, pipelining and
//! recovery.

pub mod client;
pub mod connection;

pub use client::{BoltClient, ConnectionState, ServerReply};
pub use connection::BoltConnection;

use crate::bolt::BoltVersion;

/// User agent announced in HELLO.
pub const CLIENT_USER_AGENT: &str = concat!("graphbolt-driver/", env!("CARGO_PKG_VERSION"));

/// Versions proposed during the handshake, highest preference first.
pub const PROPOSED_VERSIONS: [BoltVersion; 4] = [
    BoltVersion::V5_0,
    BoltVersion::V4_4,
    BoltVersion::V4_3,
    BoltVersion::V4_2,
];
